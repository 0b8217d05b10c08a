use std::fmt::Write as _;
use std::net::SocketAddr;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::core::{
    BonusOutcome, CurvePoint, PeriodOutcome, annual_bonus_tax, monthly_tax_curve, simulate,
    split_income,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

// Keeps accidental huge splits and curve domains from melting the server.
const MAX_PERIODS: usize = 10_000;
const MAX_CURVE_SAMPLES: f64 = 100_000.0;

#[derive(Parser, Debug)]
#[command(
    name = "withhold",
    about = "Cumulative wage-withholding calculator (progressive brackets, lump-sum splitting, separate annual-bonus regime)"
)]
struct Cli {
    #[arg(long, help = "Total amount disbursed across consecutive periods")]
    total: f64,
    #[arg(
        long,
        help = "Disbursement per period; any remainder becomes a final short period"
    )]
    chunk_size: f64,
    #[arg(
        long,
        help = "Annual one-off bonus taxed under the separate bonus schedule"
    )]
    bonus: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct SplitRequest {
    total: f64,
    chunk_size: f64,
    bonus: Option<f64>,
}

fn build_request(cli: Cli) -> Result<SplitRequest, String> {
    if !cli.total.is_finite() || cli.total < 0.0 {
        return Err("--total must be >= 0".to_string());
    }

    if !cli.chunk_size.is_finite() || cli.chunk_size <= 0.0 {
        return Err("--chunk-size must be > 0".to_string());
    }

    if cli.total / cli.chunk_size > MAX_PERIODS as f64 {
        return Err(format!(
            "--chunk-size splits --total into more than {MAX_PERIODS} periods"
        ));
    }

    if let Some(bonus) = cli.bonus {
        if !bonus.is_finite() || bonus < 0.0 {
            return Err("--bonus must be >= 0".to_string());
        }
    }

    Ok(SplitRequest {
        total: cli.total,
        chunk_size: cli.chunk_size,
        bonus: cli.bonus,
    })
}

fn render_split_report(request: SplitRequest) -> Result<String, String> {
    let chunks = split_income(request.total, request.chunk_size).map_err(|e| e.to_string())?;
    let result = simulate(&chunks).map_err(|e| e.to_string())?;

    let mut out = String::new();
    for period in &result.periods {
        let _ = writeln!(out, "{}", period.detail);
    }
    let _ = writeln!(
        out,
        "total income: {:.2}, total tax withheld: {:.2}",
        result.total_income, result.total_tax
    );

    if let Some(bonus) = request.bonus {
        let outcome = annual_bonus_tax(bonus).map_err(|e| e.to_string())?;
        let _ = writeln!(out, "{}", outcome.detail);
    }

    Ok(out)
}

pub fn run_cli() -> Result<(), String> {
    let request = build_request(Cli::parse())?;
    print!("{}", render_split_report(request)?);
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    total: Option<f64>,
    chunk_size: Option<f64>,
    // Explicit per-period incomes; overrides total/chunkSize when present.
    periods: Option<Vec<f64>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    total_income: f64,
    total_tax: f64,
    chunk_size: Option<f64>,
    periods: Vec<PeriodOutcome>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BonusPayload {
    bonus: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CurvePayload {
    start: Option<f64>,
    end: Option<f64>,
    step: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CurveResponse {
    start: f64,
    end: f64,
    step: f64,
    points: Vec<CurvePoint>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn simulate_response_from_payload(payload: SimulatePayload) -> Result<SimulateResponse, String> {
    let (incomes, chunk_size) = match payload.periods {
        Some(periods) => {
            if periods.len() > MAX_PERIODS {
                return Err(format!("periods must contain at most {MAX_PERIODS} entries"));
            }
            (periods, None)
        }
        None => {
            // Defaults reproduce the 500k lump-sum demonstration.
            let total = payload.total.unwrap_or(500_000.0);
            let chunk_size = payload.chunk_size.unwrap_or(35_999.0);
            if !total.is_finite() || !chunk_size.is_finite() {
                return Err("total and chunkSize must be finite".to_string());
            }
            if chunk_size > 0.0 && total / chunk_size > MAX_PERIODS as f64 {
                return Err(format!(
                    "chunkSize splits total into more than {MAX_PERIODS} periods"
                ));
            }
            let chunks = split_income(total, chunk_size).map_err(|e| e.to_string())?;
            (chunks, Some(chunk_size))
        }
    };

    let result = simulate(&incomes).map_err(|e| e.to_string())?;
    Ok(SimulateResponse {
        total_income: result.total_income,
        total_tax: result.total_tax,
        chunk_size,
        periods: result.periods,
    })
}

fn bonus_response_from_payload(payload: BonusPayload) -> Result<BonusOutcome, String> {
    let bonus = payload.bonus.unwrap_or(36_000.0);
    if !bonus.is_finite() {
        return Err("bonus must be finite".to_string());
    }
    annual_bonus_tax(bonus).map_err(|e| e.to_string())
}

fn curve_response_from_payload(payload: CurvePayload) -> Result<CurveResponse, String> {
    let start = payload.start.unwrap_or(5_000.0);
    let end = payload.end.unwrap_or(200_000.0);
    let step = payload.step.unwrap_or(100.0);

    if !start.is_finite() || !end.is_finite() || !step.is_finite() {
        return Err("start, end and step must be finite".to_string());
    }
    if step > 0.0 && (end - start) / step > MAX_CURVE_SAMPLES {
        return Err("curve domain requires too many samples; increase step".to_string());
    }

    let points = monthly_tax_curve(start, end, step).map_err(|e| e.to_string())?;
    Ok(CurveResponse {
        start,
        end,
        step,
        points,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/bonus", get(bonus_get_handler).post(bonus_post_handler))
        .route("/api/curve", get(curve_get_handler).post(curve_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Withholding HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    match simulate_response_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    match simulate_response_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn bonus_get_handler(Query(payload): Query<BonusPayload>) -> Response {
    match bonus_response_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn bonus_post_handler(Json(payload): Json<BonusPayload>) -> Response {
    match bonus_response_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn curve_get_handler(Query(payload): Query<CurvePayload>) -> Response {
    match curve_response_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn curve_post_handler(Json(payload): Json<CurvePayload>) -> Response {
    match curve_response_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn simulate_payload_from_json(json: &str) -> SimulatePayload {
        serde_json::from_str(json).expect("valid payload JSON")
    }

    fn sample_cli() -> Cli {
        Cli {
            total: 500_000.0,
            chunk_size: 35_999.0,
            bonus: None,
        }
    }

    #[test]
    fn build_request_accepts_the_demo_arguments() {
        let request = build_request(sample_cli()).unwrap();
        assert_approx(request.total, 500_000.0);
        assert_approx(request.chunk_size, 35_999.0);
        assert!(request.bonus.is_none());
    }

    #[test]
    fn build_request_rejects_bad_arguments() {
        let mut cli = sample_cli();
        cli.total = -1.0;
        assert_eq!(build_request(cli).unwrap_err(), "--total must be >= 0");

        let mut cli = sample_cli();
        cli.chunk_size = 0.0;
        assert_eq!(build_request(cli).unwrap_err(), "--chunk-size must be > 0");

        let mut cli = sample_cli();
        cli.bonus = Some(-5.0);
        assert_eq!(build_request(cli).unwrap_err(), "--bonus must be >= 0");

        let mut cli = sample_cli();
        cli.chunk_size = 0.001;
        assert!(build_request(cli).unwrap_err().contains("periods"));
    }

    #[test]
    fn split_report_shows_every_period_and_the_invariant_total() {
        let report = render_split_report(SplitRequest {
            total: 500_000.0,
            chunk_size: 35_999.0,
            bonus: None,
        })
        .unwrap();

        // 13 full chunks of 35,999 plus the 32,013 remainder, then the total.
        assert_eq!(report.lines().count(), 15);
        assert!(report.contains("total tax withheld: 97080.00"));
    }

    #[test]
    fn split_report_appends_the_bonus_breakdown() {
        let report = render_split_report(SplitRequest {
            total: 100_000.0,
            chunk_size: 100_000.0,
            bonus: Some(36_000.0),
        })
        .unwrap();
        assert!(report.contains("bonus tax: 1080.00"));
    }

    #[test]
    fn simulate_payload_maps_camel_case_fields() {
        let payload =
            simulate_payload_from_json(r#"{"total": 500000, "chunkSize": 143999}"#);
        let response = simulate_response_from_payload(payload).unwrap();
        assert_eq!(response.periods.len(), 4);
        assert_approx(response.total_tax, 97_080.0);
        assert_approx(response.chunk_size.unwrap(), 143_999.0);
    }

    #[test]
    fn simulate_defaults_reproduce_the_lump_sum_demo() {
        let response = simulate_response_from_payload(SimulatePayload::default()).unwrap();
        assert_approx(response.total_income, 500_000.0);
        assert_approx(response.total_tax, 97_080.0);
    }

    #[test]
    fn explicit_periods_override_total_and_chunk_size() {
        let payload = simulate_payload_from_json(
            r#"{"total": 1, "chunkSize": 1, "periods": [36000, 36000]}"#,
        );
        let response = simulate_response_from_payload(payload).unwrap();
        assert_eq!(response.periods.len(), 2);
        assert!(response.chunk_size.is_none());
        assert_approx(response.total_tax, 72_000.0 * 0.10 - 2_520.0);
    }

    #[test]
    fn simulate_rejects_invalid_payloads() {
        let payload = simulate_payload_from_json(r#"{"total": 500000, "chunkSize": 0}"#);
        assert_eq!(
            simulate_response_from_payload(payload).unwrap_err(),
            "chunk size must be > 0"
        );

        let payload = simulate_payload_from_json(r#"{"periods": [100, -5]}"#);
        assert_eq!(
            simulate_response_from_payload(payload).unwrap_err(),
            "income amounts must be >= 0"
        );

        let payload = simulate_payload_from_json(r#"{"total": 500000, "chunkSize": 0.001}"#);
        assert!(
            simulate_response_from_payload(payload)
                .unwrap_err()
                .contains("periods")
        );
    }

    #[test]
    fn bonus_endpoint_uses_the_separate_schedule() {
        let response = bonus_response_from_payload(BonusPayload {
            bonus: Some(144_000.0),
        })
        .unwrap();
        assert_approx(response.monthly_equivalent, 12_000.0);
        assert_approx(response.tax, 144_000.0 * 0.10 - 210.0);

        assert_eq!(
            bonus_response_from_payload(BonusPayload { bonus: Some(-1.0) }).unwrap_err(),
            "income amounts must be >= 0"
        );
    }

    #[test]
    fn curve_endpoint_samples_and_caps_the_domain() {
        let response = curve_response_from_payload(CurvePayload {
            start: Some(5_000.0),
            end: Some(6_000.0),
            step: Some(500.0),
        })
        .unwrap();
        assert_eq!(response.points.len(), 2);
        assert_approx(response.points[0].tax, 150.0);

        let err = curve_response_from_payload(CurvePayload {
            start: Some(0.0),
            end: Some(200_000.0),
            step: Some(0.001),
        })
        .unwrap_err();
        assert!(err.contains("increase step"));
    }
}
