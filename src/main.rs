//! 코드네임즈 TCP 서버 진입점
//!
//! 사용법: `codenames-server [host port]`
//!
//! 환경변수 (.env 파일 지원):
//! - server_host: 바인딩 호스트 (기본값: "0.0.0.0")
//! - server_port: 바인딩 포트 (기본값: "55014")
//! - worker_count: 디스패치 워커 수 (기본값: "4")
//! - max_connections: 최대 동시 접속 수 (기본값: "1000")
//! - db_path: 사용자 DB 파일 경로 (기본값: "db/users.db")
//! - word_file: 단어 목록 파일 경로 (기본값: "words.txt")

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use codenames_server::{validate_config, CodenamesServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // 로깅 설정
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // 환경 설정 로드 + 인자 덮어쓰기
    let mut config = ServerConfig::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    config.apply_args(&args);

    validate_config(&config)?;

    info!("=== 코드네임즈 서버 설정 ===");
    info!("바인딩 주소: {}", config.bind_address());
    info!("워커 수: {}", config.worker_count);
    info!("사용자 DB: {}", config.db_path);
    info!("단어 파일: {}", config.word_file);
    info!("===========================");

    // 서버 생성 (DB 초기화 실패 시 비정상 종료)
    let server = Arc::new(
        CodenamesServer::new(config)
            .await
            .context("서버 초기화 실패")?,
    );

    // accept 루프 실행
    let run_server = server.clone();
    let server_handle = tokio::spawn(async move { run_server.run().await });

    // 종료 시그널 대기
    tokio::signal::ctrl_c().await?;
    info!("종료 시그널 수신, 서버를 중지합니다...");

    server.trigger_shutdown();

    match server_handle.await {
        Ok(result) => result?,
        Err(e) => error!("서버 태스크 종료 오류: {}", e),
    }

    Ok(())
}
