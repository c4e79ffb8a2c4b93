use std::net::SocketAddr;
use std::path::PathBuf;

use configs::{AppConfig, StorageBackend};
use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

struct TestApp {
    base_url: String,
}

fn test_config(backend: StorageBackend, path: Option<&PathBuf>) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.jwt_secret = "e2e-secret-0123456789abcdef0123456789".into();
    cfg.hashing.memory_kib = 8;
    cfg.hashing.iterations = 1;
    cfg.hashing.parallelism = 1;
    cfg.storage.backend = backend;
    if let Some(p) = path {
        cfg.storage.path = p.display().to_string();
    }
    cfg
}

async fn start_server(cfg: &AppConfig) -> anyhow::Result<TestApp> {
    let state = server::build_state(cfg).await?;
    let app = server::build_app(state);

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });

    Ok(TestApp { base_url })
}

fn client() -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().cookie_store(true).build()?)
}

fn temp_store_path() -> PathBuf {
    std::env::temp_dir().join(format!("authkit-e2e-{}", Uuid::new_v4())).join("credentials.json")
}

#[tokio::test]
async fn e2e_register_login_and_me_via_cookie() -> anyhow::Result<()> {
    let app = start_server(&test_config(StorageBackend::Memory, None)).await?;
    let client = client()?;
    let email = format!("e2e_{}@example.com", Uuid::new_v4());
    let creds = json!({"email": email, "password": "S3curePass!"});

    let resp = client.get(format!("{}/", app.base_url)).send().await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);
    assert_eq!(resp.text().await?, "Project Auth-Kit is running!");

    let resp = client
        .post(format!("{}/api/auth/register", app.base_url))
        .json(&creds)
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::CREATED);

    let resp = client
        .post(format!("{}/api/auth/register", app.base_url))
        .json(&creds)
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::CONFLICT);

    // Unauthenticated before login.
    let resp = client.get(format!("{}/api/me", app.base_url)).send().await?;
    assert_eq!(resp.status(), HttpStatusCode::UNAUTHORIZED);

    let resp = client
        .post(format!("{}/api/auth/login", app.base_url))
        .json(&creds)
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "Login successful!");

    // The cookie store now carries auth_token.
    let resp = client.get(format!("{}/api/me", app.base_url)).send().await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);
    let me: Value = resp.json().await?;
    assert_eq!(me["email"], email.as_str());
    Ok(())
}

#[tokio::test]
async fn e2e_bearer_token_from_login_body() -> anyhow::Result<()> {
    let app = start_server(&test_config(StorageBackend::Memory, None)).await?;
    let client = reqwest::Client::new();
    let email = format!("e2e_{}@example.com", Uuid::new_v4());
    let creds = json!({"email": email, "password": "S3curePass!"});

    client.post(format!("{}/api/auth/register", app.base_url)).json(&creds).send().await?;
    let body: Value = client
        .post(format!("{}/api/auth/login", app.base_url))
        .json(&creds)
        .send()
        .await?
        .json()
        .await?;
    let token = body["token"].as_str().unwrap_or_default().to_string();

    let resp = client
        .get(format!("{}/api/me", app.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn e2e_file_backend_survives_restart() -> anyhow::Result<()> {
    let path = temp_store_path();
    let cfg = test_config(StorageBackend::File, Some(&path));
    let email = format!("e2e_{}@example.com", Uuid::new_v4());
    let creds = json!({"email": email, "password": "S3curePass!"});

    let first = start_server(&cfg).await?;
    let resp = client()?
        .post(format!("{}/api/auth/register", first.base_url))
        .json(&creds)
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::CREATED);
    assert!(path.exists());

    // A second instance over the same file sees the record.
    let second = start_server(&cfg).await?;
    let client = client()?;
    let resp = client
        .post(format!("{}/api/auth/login", second.base_url))
        .json(&creds)
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);

    let resp = client
        .post(format!("{}/api/auth/register", second.base_url))
        .json(&creds)
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::CONFLICT);

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
    Ok(())
}

#[tokio::test]
async fn e2e_run_stops_on_shutdown_signal() -> anyhow::Result<()> {
    let mut cfg = test_config(StorageBackend::Memory, None);
    // Grab a free port, release it, then hand it to `run`.
    let port = {
        let socket = std::net::TcpListener::bind("127.0.0.1:0")?;
        socket.local_addr()?.port()
    };
    cfg.server.port = port;

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(server::run(cfg, async move {
        let _ = rx.await;
    }));

    let base_url = format!("http://127.0.0.1:{port}");
    let client = reqwest::Client::new();
    let mut healthy = false;
    for _ in 0..50 {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            healthy = resp.status() == HttpStatusCode::OK;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(healthy, "server did not come up on {base_url}");

    let _ = tx.send(());
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await??;
    assert!(result.is_ok());
    Ok(())
}
