// src/main.rs

use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::error::Error;

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    expires_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Employee {
    id: String,
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base_url =
        std::env::var("PAYDESK_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());
    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
    let client = Client::new();

    // Test 1: Health check
    println!("\n🔍 Testing health check endpoint...");
    let health = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json::<HealthResponse>()
        .await?;
    println!("Health check response: {:?}", health);

    // Test 2: API is closed without a token
    println!("\n🔍 Testing that the API requires a token...");
    let unauthorized = client
        .get(format!("{}/api/employees", base_url))
        .send()
        .await?;
    println!("Status without token: {}", unauthorized.status());
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

    // Test 3: Login
    println!("\n🔍 Logging in as {}...", username);
    let login = client
        .post(format!("{}/api/admin/login", base_url))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await?
        .error_for_status()?
        .json::<LoginResponse>()
        .await?;
    println!("Token expires at {}", login.expires_at);

    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", login.token))?,
    );
    let api = Client::builder().default_headers(headers).build()?;

    // Test 4: Create an employee
    println!("\n🔍 Creating an employee...");
    let employee = api
        .post(format!("{}/api/employees", base_url))
        .json(&json!({
            "name": "Test Worker",
            "perDayRate": 1000,
            "paymentDivision": { "cash": 636, "account": 364 }
        }))
        .send()
        .await?
        .error_for_status()?
        .json::<Employee>()
        .await?;
    println!("Created {} ({})", employee.name, employee.id);

    // Test 5: Mark a week of attendance
    println!("\n🔍 Marking attendance for 2025-01-01..2025-01-05...");
    let marked = api
        .put(format!("{}/api/employees/{}/attendance", base_url, employee.id))
        .json(&json!({
            "dates": ["2025-01-01", "2025-01-02", "2025-01-03", "2025-01-04", "2025-01-05"],
            "attendance": { "status": "Present", "attendanceType": "Full Day" }
        }))
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await?;
    println!("Attendance: created={} updated={}", marked["created"], marked["updated"]);

    // Test 6: Weekly report
    println!("\n🔍 Fetching the weekly report for week 1...");
    let report = api
        .get(format!("{}/api/months/2025-01/weeks/1/report", base_url))
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    // Test 7: Pay the week, then try again
    let pay_url = format!(
        "{}/api/employees/{}/months/2025-01/weeks/1/pay",
        base_url, employee.id
    );
    println!("\n🔍 Paying week 1...");
    let paid = api.post(&pay_url).json(&json!({})).send().await?;
    println!("Payment status: {}", paid.status());
    let outcome = paid.error_for_status()?.json::<Value>().await?;
    println!(
        "Paid {} (total {})",
        outcome["weeklyPay"]["amountPaid"], outcome["weeklyPay"]["totalAmount"]
    );

    println!("\n🔍 Paying week 1 a second time...");
    let duplicate = api.post(&pay_url).json(&json!({})).send().await?;
    println!("Duplicate payment status: {}", duplicate.status());
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    // Test 8: Monthly report as CSV
    println!("\n🔍 Downloading the monthly report...");
    let csv = api
        .get(format!("{}/api/months/2025-01/report/csv", base_url))
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    println!("{}", csv);

    // Clean up
    let deleted = api
        .delete(format!("{}/api/employees/{}", base_url, employee.id))
        .send()
        .await?;
    println!("\nDeleted test employee: {}", deleted.status());

    println!("\n✅ All checks passed");
    Ok(())
}
