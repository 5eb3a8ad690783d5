use std::{future::Future, time::Duration};

use sqlx::postgres::PgConnectOptions;
use storefront::{AppState, construct_app_state, infra::get_config_settings, start_server};
use tokio::task::JoinHandle;

pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// Asserts that a function returns an expected value or retries until it does.
/// Retries every 500ms if the values do not match.
/// Will fail immediately on an error or after 60 retries (30 seconds).
pub async fn assert_until_eq<F, Fut, T, E>(f: F, expected_value: T, label: &str)
where
    F: Fn() -> Fut,
    E: std::fmt::Debug,
    Fut: Future<Output = Result<T, E>>,
    T: PartialEq + std::fmt::Debug,
{
    let delay_ms = 500;
    let max_times = 60;
    let mut times: usize = 0;
    let mut result: T = f().await.unwrap();
    while times < max_times {
        times += 1;
        if result == expected_value {
            break;
        } else {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            println!("Retry #{times} {label}");
            result = f().await.unwrap();
        }
    }
    assert_eq!(result, expected_value);
}

pub async fn start_test_server(
    connect_options: PgConnectOptions,
) -> (JoinHandle<Result<(), anyhow::Error>>, AppState) {
    let mut settings = get_config_settings().expect("Could not read application configuration.");
    settings.database.database_name = connect_options
        .get_database()
        .expect("Expected database name.")
        .into();
    settings.application.port = free_port();
    settings.payments.stripe.webhook_secret = WEBHOOK_SECRET.to_owned();
    settings.email.api_key = String::new();

    let app_state = construct_app_state(settings)
        .await
        .expect("Expected AppState to be created.");
    let server_handle = tokio::task::spawn(start_server(app_state.clone()));

    wait_until_listening(&app_state).await;
    (server_handle, app_state)
}

/// Servers of earlier tests keep running until the test binary exits.
fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("Expected a free port.")
}

pub fn base_url(app_state: &AppState) -> String {
    format!("http://{}", app_state.settings.application.address())
}

async fn wait_until_listening(app_state: &AppState) {
    let url = format!("{}/healthcheck", base_url(app_state));
    assert_until_eq(
        || async {
            Ok::<_, std::convert::Infallible>(
                reqwest::get(&url)
                    .await
                    .map(|res| res.status().is_success())
                    .unwrap_or(false),
            )
        },
        true,
        "Waiting for the web server to accept requests.",
    )
    .await;
}
