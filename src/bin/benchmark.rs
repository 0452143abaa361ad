use appointment_scheduler::domain::models::auth::{Claims, ADMIN_ROLE, TOKEN_AUDIENCE};
use chrono::{Duration as ChronoDuration, Utc};
use colored::*;
use governor::{Quota, RateLimiter};
use hdrhistogram::Histogram;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::env;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use uuid::Uuid;

const DURATION_SECS: u64 = 20;
const CONTENDERS: usize = 25;

struct Target {
    name: &'static str,
    url: String,
}

struct Admin {
    access_token: String,
    csrf_token: String,
}

#[tokio::main]
async fn main() {
    let base_url = env::var("BENCH_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    println!("{}", "🚀 Starting Benchmark Suite".bold().green());
    println!("Target URL: {}", base_url);

    let client = Client::builder()
        .pool_max_idle_per_host(1000)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    if client.get(format!("{}/health", base_url)).send().await.is_err() {
        eprintln!("{}", format!("❌ Server is NOT reachable at {}. Please start it first.", base_url).red().bold());
        return;
    }

    println!("\n{}", "⚙️  Setting up benchmark data...".yellow());
    let admin = mint_admin_token();
    let date = (Utc::now() + ChronoDuration::days(7)).date_naive().format("%Y-%m-%d").to_string();
    let slug = setup_session_type(&client, &base_url, &admin, &date).await;

    println!("{}", "✅ Data created successfully.".green());
    println!("   Session type: {}", slug);
    println!("   Date:         {}", date);

    let targets = vec![
        Target {
            name: "Health Check (Public)",
            url: format!("{}/health", base_url),
        },
        Target {
            name: "List Slots (Public Read)",
            url: format!("{}/api/v1/session-types/{}/slots?date={}", base_url, slug, date),
        },
        Target {
            name: "Available Dates, 4 weeks (Public Read)",
            url: format!(
                "{}/api/v1/session-types/{}/dates?start={}&end={}",
                base_url,
                slug,
                Utc::now().date_naive(),
                (Utc::now() + ChronoDuration::days(28)).date_naive()
            ),
        },
    ];

    let rps_stages = vec![10, 50, 200, 1000];

    for target in targets {
        println!("\n{}", "=".repeat(60));
        println!("Benchmarking Endpoint: {}", target.name.cyan().bold());
        println!("URL: {}", target.url);
        println!("{}", "=".repeat(60));

        println!("{:<10} | {:<15} | {:<15} | {:<15}", "RPS", "Mean (ms)", "P99 (ms)", "Success Rate");
        println!("{:-<10}-+-{:-<15}-+-{:-<15}-+-{:-<15}", "", "", "", "");

        for &rps in &rps_stages {
            run_stage(&client, &target, rps).await;
        }
    }

    run_contention(&client, &base_url, &slug, &date).await;
}

/// Signs an admin token with the key the server's JWT_PUBLIC_KEY pairs with.
fn mint_admin_token() -> Admin {
    let key_path = env::var("BENCH_SIGNING_KEY").unwrap_or_else(|_| "tests/keys/test_private.pem".to_string());
    let issuer = env::var("AUTH_ISSUER").unwrap_or_else(|_| "https://auth.scheduler.local".to_string());
    let pem = std::fs::read(&key_path).expect("Failed to read signing key");

    let now = Utc::now().timestamp() as usize;
    let csrf_token = Uuid::new_v4().to_string();
    let claims = Claims {
        iss: issuer,
        sub: "benchmark".to_string(),
        aud: TOKEN_AUDIENCE.to_string(),
        exp: now + 3600,
        iat: now,
        jti: Uuid::new_v4().to_string(),
        role: ADMIN_ROLE.to_string(),
        csrf_token: csrf_token.clone(),
    };

    let key = EncodingKey::from_ed_pem(&pem).expect("Signing key is not an Ed25519 PEM");
    let access_token = encode(&Header::new(Algorithm::EdDSA), &claims, &key).expect("Failed to sign token");
    Admin { access_token, csrf_token }
}

/// Creates a throwaway session type and opens the benchmark date with an
/// added window, leaving the weekly rules alone.
async fn setup_session_type(client: &Client, base_url: &str, admin: &Admin, date: &str) -> String {
    let slug = format!("bench-{}", &Uuid::new_v4().simple().to_string()[..8]);

    let res = client.post(format!("{}/api/v1/admin/session-types", base_url))
        .header("Cookie", format!("access_token={}", admin.access_token))
        .header("X-CSRF-Token", &admin.csrf_token)
        .json(&json!({
            "name": "Benchmark Session",
            "slug": slug,
            "duration_min": 30,
            "buffer_after_min": 0,
            "max_advance_days": 60
        }))
        .send()
        .await
        .expect("Failed to send session type create request");

    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().await.unwrap_or_default();
        panic!("Failed to create session type. Status: {}. Body: {}", status, txt);
    }

    let res = client.post(format!("{}/api/v1/admin/availability/overrides", base_url))
        .header("Cookie", format!("access_token={}", admin.access_token))
        .header("X-CSRF-Token", &admin.csrf_token)
        .json(&json!({
            "date": date,
            "kind": "add_window",
            "start": "08:00",
            "end": "18:00",
            "note": "benchmark"
        }))
        .send()
        .await
        .expect("Failed to send override request");

    if !res.status().is_success() {
        panic!("Failed to open benchmark date: status {}", res.status());
    }

    slug
}

async fn run_stage(client: &Client, target: &Target, rps: u32) {
    let limiter = Arc::new(RateLimiter::direct(
        Quota::per_second(NonZeroU32::new(rps).unwrap())
    ));

    let (tx, mut rx) = mpsc::channel(50000);
    let start_time = Instant::now();
    let duration = Duration::from_secs(DURATION_SECS);

    loop {
        if start_time.elapsed() > duration {
            break;
        }

        if limiter.check().is_ok() {
            let client = client.clone();
            let url = target.url.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let req_start = Instant::now();
                let res = client.get(&url).send().await;
                let latency = req_start.elapsed();

                let success = match res {
                    Ok(r) => r.status().is_success(),
                    Err(_) => false,
                };

                let _ = tx.send((latency, success)).await;
            });
        } else {
            tokio::task::yield_now().await;
        }
    }

    drop(tx);

    let mut histogram = Histogram::<u64>::new(3).unwrap();
    let mut successes = 0;
    let mut total = 0;

    while let Some((latency, success)) = rx.recv().await {
        total += 1;
        if success { successes += 1; }
        histogram.record(latency.as_micros() as u64).unwrap();
    }

    let mean_ms = histogram.mean() / 1000.0;
    let p99_ms = histogram.value_at_quantile(0.99) as f64 / 1000.0;
    let success_rate = if total > 0 { (successes as f64 / total as f64) * 100.0 } else { 0.0 };

    println!(
        "{:<10} | {:<15.2} | {:<15.2} | {:<14.1}%",
        rps,
        mean_ms,
        p99_ms,
        success_rate
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
}

/// Fires many reservations at one slot at once. Exactly one should win.
async fn run_contention(client: &Client, base_url: &str, slug: &str, date: &str) {
    println!("\n{}", "=".repeat(60));
    println!("Contention: {} simultaneous bookings for one slot", CONTENDERS.to_string().cyan().bold());
    println!("{}", "=".repeat(60));

    let slots: Value = client.get(format!("{}/api/v1/session-types/{}/slots?date={}", base_url, slug, date))
        .send()
        .await
        .expect("Failed to list slots")
        .json()
        .await
        .expect("Failed to parse slots");
    let Some(slot) = slots["slots"][0].as_str().map(str::to_string) else {
        eprintln!("{}", "❌ No slot available for the contention round.".red().bold());
        return;
    };

    let url = format!("{}/api/v1/session-types/{}/book", base_url, slug);
    let mut set = JoinSet::new();
    for i in 0..CONTENDERS {
        let client = client.clone();
        let url = url.clone();
        let body = json!({
            "date": date,
            "time": slot,
            "requester_name": format!("Bench {}", i),
            "requester_email": format!("bench{}@example.com", i)
        });
        set.spawn(async move {
            let started = Instant::now();
            let status = client.post(&url).json(&body).send().await.map(|r| r.status()).ok();
            (status, started.elapsed())
        });
    }

    let mut histogram = Histogram::<u64>::new(3).unwrap();
    let (mut won, mut lost, mut failed) = (0, 0, 0);
    while let Some(Ok((status, latency))) = set.join_next().await {
        histogram.record(latency.as_micros() as u64).unwrap();
        match status {
            Some(StatusCode::CREATED) => won += 1,
            Some(StatusCode::CONFLICT) => lost += 1,
            _ => failed += 1,
        }
    }

    println!("Slot:        {}", slot);
    println!("Won:         {}", won);
    println!("Rejected:    {}", lost);
    println!("Errors:      {}", failed);
    println!("P99 (ms):    {:.2}", histogram.value_at_quantile(0.99) as f64 / 1000.0);

    if won == 1 {
        println!("{}", "✅ Exactly one reservation succeeded.".green());
    } else {
        println!("{}", format!("❌ Expected one winner, got {}.", won).red().bold());
    }
}
