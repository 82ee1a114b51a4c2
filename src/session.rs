//! 세션 모듈
//!
//! 접속한 피어 하나를 표현합니다. 소켓 쓰기 반쪽과 세션 상태
//! (인증 토큰, 닉네임, 현재 상태, 게임방 역참조)를 보관합니다.
//! 동시 송신은 세션별 송신 뮤텍스로 직렬화되어 한 레코드가
//! 바이트 단위로 섞이지 않습니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use tracing::debug;

use crate::game::room::GameRoom;
use crate::protocol::Record;
use crate::tool::error::{ServerError, ServerResult};

/// 세션 상태
///
/// 상태에 따라 수신 패킷이 서로 다른 핸들러로 분배됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// CHECK_ID, SIGNUP, LOGIN, TOKEN, EDIT_NICK 처리
    Authenticating,
    /// 매칭 대기 중
    WaitingMatch,
    /// 로비 패킷 처리
    InLobby,
    /// CHAT, HINT, ANSWER, REPORT 처리
    InGame,
}

/// 세션 내부 가변 상태
struct SessionInner {
    state: SessionState,
    token: String,
    nickname: String,
    user_id: String,
    room: Weak<GameRoom>,
}

/// 접속한 피어 하나
pub struct Session {
    session_id: u64,
    addr: String,
    writer: Option<Mutex<BufWriter<OwnedWriteHalf>>>,
    inner: Mutex<SessionInner>,
    closed: AtomicBool,
}

impl Session {
    /// 새로운 세션 생성
    ///
    /// accept 직후 쓰기 반쪽을 받아 `Authenticating` 상태로 시작합니다.
    pub fn new(session_id: u64, addr: String, writer: OwnedWriteHalf) -> Self {
        debug!("세션 생성: {} ({})", session_id, addr);

        Self {
            session_id,
            addr,
            writer: Some(Mutex::new(BufWriter::new(writer))),
            inner: Mutex::new(SessionInner {
                state: SessionState::Authenticating,
                token: String::new(),
                nickname: String::new(),
                user_id: String::new(),
                room: Weak::new(),
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// 소켓 없는 테스트용 세션 생성
    #[cfg(test)]
    pub(crate) fn detached(session_id: u64, nickname: &str) -> Self {
        Self {
            session_id,
            addr: "test".to_string(),
            writer: None,
            inner: Mutex::new(SessionInner {
                state: SessionState::InGame,
                token: format!("token-{}", session_id),
                nickname: nickname.to_string(),
                user_id: format!("user{}", session_id),
                room: Weak::new(),
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// 세션 ID
    pub fn id(&self) -> u64 {
        self.session_id
    }

    /// 피어 주소
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// 레코드 송신
    ///
    /// 인코딩된 레코드 한 줄을 개행과 함께 쓰고 즉시 flush 합니다.
    /// 송신 뮤텍스가 동시 호출을 직렬화합니다.
    pub async fn send(&self, record: &Record) -> ServerResult<()> {
        if self.is_closed() {
            return Err(ServerError::transport(
                Some(self.session_id),
                Some(self.addr.clone()),
                "닫힌 세션으로 송신 시도",
            ));
        }

        let writer = self.writer.as_ref().ok_or_else(|| {
            ServerError::transport(Some(self.session_id), None, "소켓이 연결되지 않은 세션")
        })?;

        let mut guard = writer.lock().await;
        let mut line = record.encode();
        line.push('\n');

        guard.write_all(line.as_bytes()).await.map_err(|e| {
            ServerError::transport(Some(self.session_id), Some(self.addr.clone()), &e.to_string())
        })?;
        guard.flush().await.map_err(|e| {
            ServerError::transport(Some(self.session_id), Some(self.addr.clone()), &e.to_string())
        })?;

        debug!("세션 {} 송신: {}", self.session_id, record);
        Ok(())
    }

    /// 세션 종료 (멱등)
    ///
    /// 닫힘 플래그를 세우고 소켓 쓰기 반쪽을 닫습니다.
    /// 레지스트리/게임방 정리는 연결 핸들러의 정리 경로에서 수행합니다.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        debug!("세션 종료: {} ({})", self.session_id, self.addr);

        if let Some(writer) = &self.writer {
            let mut guard = writer.lock().await;
            let _ = guard.shutdown().await;
        }
    }

    /// 닫힘 여부
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 현재 상태
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// 상태 변경
    pub async fn set_state(&self, state: SessionState) {
        self.inner.lock().await.state = state;
    }

    /// 인증 토큰 (로그인 전에는 빈 문자열)
    pub async fn token(&self) -> String {
        self.inner.lock().await.token.clone()
    }

    /// 닉네임
    pub async fn nickname(&self) -> String {
        self.inner.lock().await.nickname.clone()
    }

    /// 로그인 계정 ID
    pub async fn user_id(&self) -> String {
        self.inner.lock().await.user_id.clone()
    }

    /// 닉네임 변경
    pub async fn set_nickname(&self, nickname: &str) {
        self.inner.lock().await.nickname = nickname.to_string();
    }

    /// 로그인/회원가입 성공 시 인증 정보 일괄 저장
    pub async fn set_authenticated(&self, token: &str, nickname: &str, user_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.token = token.to_string();
        inner.nickname = nickname.to_string();
        inner.user_id = user_id.to_string();
        inner.state = SessionState::InLobby;
    }

    /// 현재 게임방 (IN_GAME 일 때만 Some)
    pub async fn room(&self) -> Option<Arc<GameRoom>> {
        self.inner.lock().await.room.upgrade()
    }

    /// 게임방 역참조 설정
    pub async fn set_room(&self, room: &Arc<GameRoom>) {
        self.inner.lock().await.room = Arc::downgrade(room);
    }

    /// 게임방 역참조 해제
    pub async fn clear_room(&self) {
        self.inner.lock().await.room = Weak::new();
    }
}
