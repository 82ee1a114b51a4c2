//! 서버 런타임
//!
//! 서비스 싱글톤을 묶어 accept 루프를 돌립니다. 종료 신호를
//! 받으면 수락을 멈추고 게임방과 세션을 순서대로 정리합니다.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::handler::ConnectionHandler;
use crate::service::{AccountService, MatchingService, RoomService, SessionService};

/// 코드네임즈 게임 서버
pub struct CodenamesServer {
    config: ServerConfig,
    sessions: Arc<SessionService>,
    rooms: Arc<RoomService>,
    connection_handler: Arc<ConnectionHandler>,
    shutdown: Notify,
}

impl CodenamesServer {
    /// 서버 생성
    ///
    /// 사용자 DB 를 열고 서비스들을 구성합니다. DB 초기화에
    /// 실패하면 서버는 시작하지 않습니다.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let accounts = Arc::new(
            AccountService::connect(&config.db_path)
                .await
                .context("사용자 DB 초기화 실패")?,
        );
        let sessions = Arc::new(SessionService::new(config.max_connections));
        let matching = Arc::new(MatchingService::new());
        let rooms = Arc::new(RoomService::new(PathBuf::from(&config.word_file)));

        let connection_handler = Arc::new(ConnectionHandler::new(
            accounts,
            sessions.clone(),
            matching,
            rooms.clone(),
            config.worker_count,
        ));

        Ok(Self {
            config,
            sessions,
            rooms,
            connection_handler,
            shutdown: Notify::new(),
        })
    }

    /// 설정된 주소로 바인딩 후 실행
    pub async fn run(&self) -> Result<()> {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("리스너 바인드 실패: {}", bind_addr))?;

        self.run_with_listener(listener).await
    }

    /// 준비된 리스너로 실행
    ///
    /// 종료 신호가 올 때까지 연결을 수락합니다. 연결마다 별도
    /// 태스크가 수신 루프를 돌며, 태스크 실패는 해당 세션만
    /// 닫고 서버는 계속 동작합니다.
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("🚀 서버가 {} 에서 실행 중입니다", local_addr);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let handler = self.connection_handler.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handler.handle_connection(stream, addr).await {
                                    error!("사용자 연결 처리 오류: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("사용자 연결 수락 실패: {}", e);
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("🛑 연결 수락 중지");
                    break;
                }
            }
        }

        self.teardown().await;
        Ok(())
    }

    /// 종료 신호 전달
    pub fn trigger_shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// 서버 정리
    ///
    /// 게임방을 먼저 강제 종료한 뒤 모든 세션을 닫습니다.
    async fn teardown(&self) {
        self.rooms.shutdown_all().await;

        let sessions = self.sessions.drain_all().await;
        let count = sessions.len();
        for session in sessions {
            session.close().await;
        }

        info!("✅ 서버 종료 완료 (세션 {}개 해제)", count);
    }
}
