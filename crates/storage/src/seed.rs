//! Demo data seeding
//!
//! Recreates the sample schema from scratch and fills it with
//! deterministic data. Runs at bootstrap only; agents never write.

use crate::Result;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use tracing::info;

const SEED: u64 = 42;

const SCHEMA: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    age INTEGER,
    created_at TEXT NOT NULL
);
CREATE TABLE projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    budget REAL,
    created_at TEXT NOT NULL
);
CREATE TABLE project_users (
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (project_id, user_id)
);
CREATE TABLE departments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    location TEXT NOT NULL
);
CREATE TABLE employees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    department_id INTEGER NOT NULL REFERENCES departments(id)
);
CREATE TABLE clients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    industry TEXT NOT NULL,
    city TEXT NOT NULL
);
CREATE TABLE contracts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id INTEGER NOT NULL REFERENCES clients(id),
    product_name TEXT NOT NULL,
    sales_rep_id INTEGER NOT NULL REFERENCES employees(id),
    amount INTEGER NOT NULL,
    term TEXT NOT NULL,
    status TEXT NOT NULL
);
";

const FIRST_NAMES: &[&str] = &[
    "Minji", "Jiwon", "Hyun", "Sujin", "Hana", "Jisoo", "Taeyang", "Joon", "Mingyu", "Eunwoo",
    "Seojin", "Hyejin", "Donghyun", "Yuna", "Sangmin",
];
const LAST_NAMES: &[&str] = &["Park", "Kim", "Lee", "Choi", "Jung", "Kang", "Yoon", "Han"];

const PROJECT_PREFIXES: &[&str] = &[
    "Atlas", "Beacon", "Comet", "Delta", "Ember", "Falcon", "Granite", "Harbor", "Iris", "Juniper",
];
const PROJECT_KINDS: &[&str] = &[
    "Data Platform",
    "Mobile App",
    "Search Revamp",
    "Billing Migration",
    "Recommendation Engine",
    "Analytics Dashboard",
];

const DEPARTMENTS: &[(&str, &str)] = &[
    ("Research", "Toronto"),
    ("Engineering", "Toronto"),
    ("Product", "Toronto"),
    ("Sales", "New York"),
    ("Customer Success", "Chicago"),
];
const JOB_TITLES: &[&str] = &[
    "Research Scientist",
    "ML Engineer",
    "Data Engineer",
    "Product Manager",
    "Sales Manager",
    "Account Executive",
    "Solutions Architect",
    "Customer Success Manager",
];
const INDUSTRIES: &[&str] = &[
    "Retail",
    "Finance",
    "Healthcare",
    "Manufacturing",
    "Technology",
    "Energy",
];
const CITIES: &[&str] = &[
    "New York",
    "Chicago",
    "San Francisco",
    "Toronto",
    "Boston",
    "Seattle",
];
const PRODUCTS: &[(&str, i64)] = &[
    ("VisionGuard AI", 120_000),
    ("TextSense NLP", 95_000),
    ("ForecastPro", 80_000),
    ("GraphInsight", 110_000),
];
const TERMS: &[&str] = &["6 months", "12 months", "24 months"];
const STATUSES: &[&str] = &["active", "pending", "closed"];

/// Row counts to generate
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub users: usize,
    pub projects: usize,
    pub departments: usize,
    pub employees: usize,
    pub clients: usize,
    pub contracts: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            users: 30,
            projects: 30,
            departments: 5,
            employees: 40,
            clients: 20,
            contracts: 60,
        }
    }
}

/// Rows written per table
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SeedSummary {
    pub users: usize,
    pub projects: usize,
    pub project_users: usize,
    pub departments: usize,
    pub employees: usize,
    pub clients: usize,
    pub contracts: usize,
}

/// Delete the database file, recreate the schema and insert sample rows
pub fn reset_and_seed(path: &Path, options: &SeedOptions) -> Result<SeedSummary> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;

    let mut rng = StdRng::seed_from_u64(SEED);
    let tx = conn.transaction()?;
    let mut summary = SeedSummary::default();
    let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let user_ids = seed_users(&tx, &mut rng, options.users, &now)?;
    summary.users = user_ids.len();

    let project_ids = seed_projects(&tx, &mut rng, options.projects, &now)?;
    summary.projects = project_ids.len();

    let max_members = user_ids.len().min(10);
    if max_members > 0 {
        for project_id in &project_ids {
            let count = rng.gen_range(1..=max_members);
            for user_id in user_ids.choose_multiple(&mut rng, count) {
                tx.execute(
                    "INSERT INTO project_users (project_id, user_id) VALUES (?1, ?2)",
                    params![project_id, user_id],
                )?;
                summary.project_users += 1;
            }
        }
    }

    let department_ids = seed_departments(&tx, options.departments)?;
    summary.departments = department_ids.len();

    let employees = seed_employees(&tx, &mut rng, options.employees, &department_ids)?;
    summary.employees = employees.len();

    let client_ids = seed_clients(&tx, &mut rng, options.clients)?;
    summary.clients = client_ids.len();

    summary.contracts = seed_contracts(&tx, &mut rng, options.contracts, &client_ids, &employees)?;

    tx.commit()?;
    info!("◆ SEEDED {:?}: {:?}", path, summary);
    Ok(summary)
}

fn person_name(rng: &mut StdRng) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Kim");
    format!("{} {}", first, last)
}

/// `minji.park@domain`, then `minji.park2@domain`, ... on collision
fn unique_email(name: &str, domain: &str, used: &mut Vec<String>) -> String {
    let local = name.to_lowercase().replace(' ', ".");
    let mut email = format!("{}@{}", local, domain);
    let mut suffix = 2;
    while used.contains(&email) {
        email = format!("{}{}@{}", local, suffix, domain);
        suffix += 1;
    }
    used.push(email.clone());
    email
}

fn seed_users(tx: &Connection, rng: &mut StdRng, count: usize, now: &str) -> Result<Vec<i64>> {
    let mut used = Vec::new();
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let name = person_name(rng);
        let email = unique_email(&name, "example.com", &mut used);
        let age: i64 = rng.gen_range(20..=60);
        tx.execute(
            "INSERT INTO users (name, email, age, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, email, age, now],
        )?;
        ids.push(tx.last_insert_rowid());
    }
    Ok(ids)
}

fn seed_projects(tx: &Connection, rng: &mut StdRng, count: usize, now: &str) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let prefix = PROJECT_PREFIXES[i % PROJECT_PREFIXES.len()];
        let kind = PROJECT_KINDS.choose(rng).copied().unwrap_or("Platform");
        let title = format!("{} {}", prefix, kind);
        let description = format!("{} initiative #{}", kind, i + 1);
        // Multiples of 500 between 2,000 and 30,000
        let budget = f64::from(rng.gen_range(4..=60u32)) * 500.0;
        tx.execute(
            "INSERT INTO projects (title, description, budget, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![title, description, budget, now],
        )?;
        ids.push(tx.last_insert_rowid());
    }
    Ok(ids)
}

fn seed_departments(tx: &Connection, count: usize) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(count);
    for idx in 0..count {
        let (base, location) = DEPARTMENTS[idx % DEPARTMENTS.len()];
        let round = idx / DEPARTMENTS.len() + 1;
        let name = if round == 1 {
            base.to_string()
        } else {
            format!("{} {}", base, round)
        };
        tx.execute(
            "INSERT INTO departments (name, location) VALUES (?1, ?2)",
            params![name, location],
        )?;
        ids.push(tx.last_insert_rowid());
    }
    Ok(ids)
}

/// Returns `(id, title)` per employee
fn seed_employees(
    tx: &Connection,
    rng: &mut StdRng,
    count: usize,
    department_ids: &[i64],
) -> Result<Vec<(i64, &'static str)>> {
    let mut used = Vec::new();
    let mut employees = Vec::with_capacity(count);
    if department_ids.is_empty() {
        return Ok(employees);
    }
    for _ in 0..count {
        let name = person_name(rng);
        let email = unique_email(&name, "vectorai.com", &mut used);
        let title = JOB_TITLES.choose(rng).copied().unwrap_or("Engineer");
        let department_id = department_ids.choose(rng).copied().unwrap_or(department_ids[0]);
        tx.execute(
            "INSERT INTO employees (name, email, title, department_id) VALUES (?1, ?2, ?3, ?4)",
            params![name, email, title, department_id],
        )?;
        employees.push((tx.last_insert_rowid(), title));
    }
    Ok(employees)
}

fn seed_clients(tx: &Connection, rng: &mut StdRng, count: usize) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let name = format!("Acme Corp {:02}", i + 1);
        let industry = INDUSTRIES.choose(rng).copied().unwrap_or("Technology");
        let city = CITIES.choose(rng).copied().unwrap_or("Toronto");
        tx.execute(
            "INSERT INTO clients (name, industry, city) VALUES (?1, ?2, ?3)",
            params![name, industry, city],
        )?;
        ids.push(tx.last_insert_rowid());
    }
    Ok(ids)
}

fn seed_contracts(
    tx: &Connection,
    rng: &mut StdRng,
    count: usize,
    client_ids: &[i64],
    employees: &[(i64, &'static str)],
) -> Result<usize> {
    let reps: Vec<i64> = employees
        .iter()
        .filter(|(_, title)| title.contains("Sales") || title.contains("Account"))
        .map(|(id, _)| *id)
        .collect();
    let reps = if reps.is_empty() {
        employees.iter().map(|(id, _)| *id).collect()
    } else {
        reps
    };
    if client_ids.is_empty() || reps.is_empty() {
        return Ok(0);
    }

    for _ in 0..count {
        let client_id = client_ids.choose(rng).copied().unwrap_or(client_ids[0]);
        let (product, price) = PRODUCTS.choose(rng).copied().unwrap_or(PRODUCTS[0]);
        let rep = reps.choose(rng).copied().unwrap_or(reps[0]);
        let amount = (price as f64 * rng.gen_range(0.8..1.3)).round() as i64;
        let term = TERMS.choose(rng).copied().unwrap_or("12 months");
        let status = STATUSES.choose(rng).copied().unwrap_or("active");
        tx.execute(
            "INSERT INTO contracts (client_id, product_name, sales_rep_id, amount, term, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![client_id, product, rep, amount, term, status],
        )?;
    }
    Ok(count)
}
