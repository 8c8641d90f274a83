//! Evaluation harness: answer a SQuAD-style question set, then judge the
//! answers against the expected ones

use anyhow::{Context, Result};
use conductor_agent::{Judge, Verdict};
use conductor_config::Config;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::commands::{build_provider, build_roster};

#[derive(Debug, Deserialize)]
struct SquadFile {
    data: Vec<SquadArticle>,
}

#[derive(Debug, Deserialize)]
struct SquadArticle {
    title: String,
    paragraphs: Vec<SquadParagraph>,
}

#[derive(Debug, Deserialize)]
struct SquadParagraph {
    qas: Vec<SquadQa>,
}

#[derive(Debug, Deserialize)]
struct SquadQa {
    question: String,
    #[serde(default)]
    answers: Vec<SquadAnswer>,
}

#[derive(Debug, Deserialize)]
struct SquadAnswer {
    text: String,
}

/// One question with its expected answer
#[derive(Debug, Clone, PartialEq)]
pub struct EvalQuestion {
    pub title: String,
    pub query: String,
    pub expected_answer: String,
}

/// Line of the `eval run` output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRecord {
    pub title: String,
    pub query: String,
    pub expected_answer: String,
    pub agent_response: String,
}

/// Line of the `eval judge` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgedRecord {
    #[serde(flatten)]
    pub record: AgentRecord,
    pub evaluator_explanation: Option<Verdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator_error: Option<String>,
}

/// Flatten a SQuAD document into questions; the first listed answer is
/// the expected one
pub fn parse_questions(json: &str) -> Result<Vec<EvalQuestion>> {
    let file: SquadFile = serde_json::from_str(json).context("Not a SQuAD-style question file")?;
    let mut questions = Vec::new();
    for article in file.data {
        for paragraph in article.paragraphs {
            for qa in paragraph.qas {
                let expected_answer = qa
                    .answers
                    .into_iter()
                    .next()
                    .map(|a| a.text)
                    .unwrap_or_default();
                questions.push(EvalQuestion {
                    title: article.title.clone(),
                    query: qa.question,
                    expected_answer,
                });
            }
        }
    }
    Ok(questions)
}

pub fn parse_records(jsonl: &str) -> Result<Vec<AgentRecord>> {
    jsonl
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid record on line {}", idx + 1))
        })
        .collect()
}

pub fn to_jsonl<T: Serialize>(records: &[T]) -> Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Share of judged records marked correct; records the judge failed on
/// are left out
pub fn accuracy(records: &[JudgedRecord]) -> Option<f64> {
    let judged: Vec<&Verdict> = records
        .iter()
        .filter_map(|r| r.evaluator_explanation.as_ref())
        .collect();
    if judged.is_empty() {
        return None;
    }
    let correct = judged.iter().filter(|v| v.is_answer_correct).count();
    Some(correct as f64 / judged.len() as f64)
}

fn default_output(prefix: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    conductor_config::results_dir().join(format!("{}_{}.jsonl", prefix, stamp))
}

async fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Run every question through the coordinator
pub async fn eval_run_command(questions: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let config = Config::load().await?;
    let content = tokio::fs::read_to_string(&questions)
        .await
        .with_context(|| format!("Failed to read {}", questions.display()))?;
    let questions = parse_questions(&content)?;
    let roster = build_roster(&config)?;
    let concurrency = config.eval.concurrency.max(1);

    println!(
        "◆ Answering {} questions ({} at a time)",
        questions.len(),
        concurrency
    );

    let coordinator = &roster.coordinator;
    let records: Vec<AgentRecord> = stream::iter(questions)
        .map(|q| async move {
            let report = coordinator.run_turn(&[], &q.query, None).await;
            info!("◆ [{}] {} → {}", q.title, q.query, report.outcome.label());
            AgentRecord {
                title: q.title,
                query: q.query,
                expected_answer: q.expected_answer,
                agent_response: report.answer,
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    let output = output.unwrap_or_else(|| default_output("agent_result"));
    write_output(&output, &to_jsonl(&records)?).await?;
    println!("✓ {} answers written to {}", records.len(), output.display());
    Ok(())
}

/// Judge every recorded answer
pub async fn eval_judge_command(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let config = Config::load().await?;
    let content = tokio::fs::read_to_string(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let records = parse_records(&content)?;
    let judge = Judge::new(build_provider(&config)?, config.eval.judge_model.clone());
    let concurrency = config.eval.concurrency.max(1);

    println!(
        "◆ Judging {} answers ({} at a time)",
        records.len(),
        concurrency
    );

    let judge = &judge;
    let judged: Vec<JudgedRecord> = stream::iter(records)
        .map(|record| async move {
            match judge
                .evaluate(&record.query, &record.expected_answer, &record.agent_response)
                .await
            {
                Ok(verdict) => JudgedRecord {
                    record,
                    evaluator_explanation: Some(verdict),
                    evaluator_error: None,
                },
                Err(e) => {
                    warn!("◆ JUDGE FAILED ON '{}': {}", record.query, e);
                    JudgedRecord {
                        record,
                        evaluator_explanation: None,
                        evaluator_error: Some(e.to_string()),
                    }
                }
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    let output = output.unwrap_or_else(|| default_output("evaluation_result"));
    write_output(&output, &to_jsonl(&judged)?).await?;

    match accuracy(&judged) {
        Some(acc) => println!(
            "✓ Accuracy: {:.1}% over {} judged answers",
            acc * 100.0,
            judged.iter().filter(|r| r.evaluator_explanation.is_some()).count()
        ),
        None => println!("✗ No answers could be judged"),
    }
    println!("Results written to {}", output.display());
    Ok(())
}
