//! 인증 핸들러
//!
//! AUTHENTICATING 상태 세션의 패킷을 처리합니다.
//! CHECK_ID, SIGNUP, LOGIN, TOKEN, EDIT_NICK 을 지원하며
//! 실패 응답은 요청한 세션에게만 전송합니다.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::protocol::{packet, Record};
use crate::service::account_service::{LoginOutcome, RenameOutcome, SignupOutcome};
use crate::service::{AccountService, SessionService};
use crate::session::Session;
use crate::tool::simple_utils::SimpleUtils;

/// 인증 핸들러
pub struct AuthHandler {
    accounts: Arc<AccountService>,
    sessions: Arc<SessionService>,
}

impl AuthHandler {
    /// 새로운 인증 핸들러 생성
    pub fn new(accounts: Arc<AccountService>, sessions: Arc<SessionService>) -> Self {
        Self { accounts, sessions }
    }

    /// 인증 패킷 처리
    pub async fn handle(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        match record.kind() {
            packet::CHECK_ID => self.handle_check_id(session, record).await,
            packet::SIGNUP => self.handle_signup(session, record).await,
            packet::LOGIN => self.handle_login(session, record).await,
            packet::TOKEN => self.handle_token(session, record).await,
            packet::EDIT_NICK => self.handle_edit_nick(session, record).await,
            other => {
                warn!("알 수 없는 인증 패킷: {} (세션 {})", other, session.id());
                let reply = Record::with_fields(packet::AUTH_ERROR, &[packet::UNKNOWN_PACKET]);
                session.send(&reply).await?;
                Ok(())
            }
        }
    }

    /// CHECK_ID|id - 아이디 중복 검사
    async fn handle_check_id(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        let id = record.field(0).unwrap_or_default();

        if id.is_empty() {
            session.send(&Record::new(packet::CHECK_ID_ERROR)).await?;
            return Ok(());
        }

        let reply = match self.accounts.check_id_exists(id).await {
            Ok(true) => Record::new(packet::CHECK_ID_DUPLICATE),
            Ok(false) => Record::new(packet::CHECK_ID_OK),
            Err(e) => {
                error!("아이디 중복 검사 실패: {}", e);
                Record::new(packet::CHECK_ID_ERROR)
            }
        };

        session.send(&reply).await?;
        Ok(())
    }

    /// SIGNUP|id|pw|nickname - 회원가입
    ///
    /// 성공 시 토큰을 발급해 세션에 바인딩하고 로비로 전환합니다.
    async fn handle_signup(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        let id = record.field(0).unwrap_or_default().to_string();
        let pw = record.field(1).unwrap_or_default().to_string();
        let nickname = record.field(2).unwrap_or_default().to_string();

        if id.is_empty() || pw.is_empty() || nickname.is_empty() {
            session.send(&Record::new(packet::SIGNUP_ERROR)).await?;
            return Ok(());
        }

        let reply = match self.accounts.signup(&id, &pw, &nickname).await {
            Ok(SignupOutcome::Success) => {
                let token = SimpleUtils::generate_token();

                match self.sessions.bind_token(session.id(), &token).await {
                    Ok(()) => {
                        session.set_authenticated(&token, &nickname, &id).await;
                        info!("회원가입 완료: {} (세션 {})", id, session.id());
                        Record::with_fields(packet::SIGNUP_OK, &[token])
                    }
                    Err(e) => {
                        error!("토큰 바인딩 실패: {}", e);
                        Record::new(packet::SIGNUP_ERROR)
                    }
                }
            }
            Ok(SignupOutcome::Duplicate) => Record::new(packet::SIGNUP_DUPLICATE),
            Err(e) => {
                error!("회원가입 실패: {}", e);
                Record::new(packet::SIGNUP_ERROR)
            }
        };

        session.send(&reply).await?;
        Ok(())
    }

    /// LOGIN|id|pw - 로그인
    async fn handle_login(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        let id = record.field(0).unwrap_or_default().to_string();
        let pw = record.field(1).unwrap_or_default().to_string();

        if id.is_empty() || pw.is_empty() {
            session.send(&Record::new(packet::LOGIN_ERROR)).await?;
            return Ok(());
        }

        let reply = match self.accounts.login(&id, &pw).await {
            Ok(LoginOutcome::Success(user)) => {
                let token = SimpleUtils::generate_token();

                match self.sessions.bind_token(session.id(), &token).await {
                    Ok(()) => {
                        session
                            .set_authenticated(&token, &user.nickname, &user.id)
                            .await;
                        info!("로그인 완료: {} (세션 {})", id, session.id());
                        Record::with_fields(packet::LOGIN_OK, &[token])
                    }
                    Err(e) => {
                        error!("토큰 바인딩 실패: {}", e);
                        Record::new(packet::LOGIN_ERROR)
                    }
                }
            }
            Ok(LoginOutcome::NoAccount) => Record::new(packet::LOGIN_NO_ACCOUNT),
            Ok(LoginOutcome::WrongPassword) => Record::new(packet::LOGIN_WRONG_PW),
            Ok(LoginOutcome::Suspended) => Record::new(packet::LOGIN_SUSPENDED),
            Err(e) => {
                error!("로그인 처리 실패: {}", e);
                Record::new(packet::LOGIN_ERROR)
            }
        };

        session.send(&reply).await?;
        Ok(())
    }

    /// TOKEN|token - 토큰 검증
    async fn handle_token(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        let token = record.field(0).unwrap_or_default();
        let own_token = session.token().await;

        let reply = if !token.is_empty() && token == own_token {
            Record::with_fields(packet::TOKEN_VALID, &[session.nickname().await])
        } else {
            Record::new(packet::INVALID_TOKEN)
        };

        session.send(&reply).await?;
        Ok(())
    }

    /// EDIT_NICK|token|newNickname - 닉네임 변경
    ///
    /// DB 의 닉네임까지 함께 변경해 세션과 저장소가 어긋나지 않게 합니다.
    async fn handle_edit_nick(&self, session: &Arc<Session>, record: &Record) -> Result<()> {
        let token = record.field(0).unwrap_or_default().to_string();
        let new_nickname = record.field(1).unwrap_or_default().to_string();

        if new_nickname.is_empty() || new_nickname.contains('|') {
            session.send(&Record::new(packet::NICKNAME_EDIT_ERROR)).await?;
            return Ok(());
        }

        let own_token = session.token().await;
        if token.is_empty() || token != own_token {
            session.send(&Record::new(packet::INVALID_TOKEN)).await?;
            return Ok(());
        }

        let user_id = session.user_id().await;
        let reply = match self.accounts.change_nickname(&user_id, &new_nickname).await {
            Ok(RenameOutcome::Success) => {
                session.set_nickname(&new_nickname).await;
                info!("닉네임 변경: {} -> {} (세션 {})", user_id, new_nickname, session.id());
                Record::new(packet::NICKNAME_EDIT_OK)
            }
            Ok(RenameOutcome::Duplicate) | Ok(RenameOutcome::NotFound) => {
                Record::new(packet::NICKNAME_EDIT_ERROR)
            }
            Err(e) => {
                error!("닉네임 변경 실패: {}", e);
                Record::new(packet::NICKNAME_EDIT_ERROR)
            }
        };

        session.send(&reply).await?;
        Ok(())
    }
}
