//! 계정 서비스
//!
//! 사용자 계정의 생성/로그인/조회와 신고, 전적 저장을 담당합니다.
//! 로컬 SQLite 파일을 단일 커넥션 풀로 열어 모든 읽기/쓰기를
//! 직렬화합니다. 비밀번호는 사용자별 랜덤 Salt 를 붙여
//! SHA-256 으로 해시한 뒤 hex 문자열로 저장합니다.

use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{error, info, warn};

use crate::game::room::MatchResult;
use crate::tool::error::ServerResult;
use crate::tool::simple_utils::SimpleUtils;

/// 신고 누적 자동 정지 기준
pub const SUSPEND_REPORT_COUNT: i64 = 5;

/// 사용자 레코드
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub nickname: String,
    pub report_count: i64,
    pub is_suspended: bool,
    pub wins: i64,
    pub losses: i64,
}

/// 회원가입 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupOutcome {
    /// 가입 성공
    Success,
    /// 아이디 또는 닉네임 중복
    Duplicate,
}

/// 로그인 결과
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// 로그인 성공
    Success(UserRecord),
    /// 없는 계정
    NoAccount,
    /// 비밀번호 불일치
    WrongPassword,
    /// 정지된 계정
    Suspended,
}

/// 신고 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// 신고 반영: 누적 횟수와 이번 신고로 정지되었는지 여부
    Reported { count: i64, suspended: bool },
    /// 대상 닉네임 없음
    NotFound,
}

/// 닉네임 변경 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Success,
    Duplicate,
    NotFound,
}

/// 계정 서비스
pub struct AccountService {
    pool: SqlitePool,
}

impl AccountService {
    /// DB 파일을 열고 스키마를 준비합니다.
    ///
    /// 파일과 상위 디렉토리가 없으면 생성합니다. 커넥션을 하나로
    /// 제한해 모든 접근이 순차 실행됩니다.
    pub async fn connect(db_path: &str) -> ServerResult<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let service = Self { pool };
        service.init_schema().await?;

        info!("✅ 사용자 DB 준비 완료: {}", db_path);
        Ok(service)
    }

    /// users 테이블 생성
    async fn init_schema(&self) -> ServerResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id            TEXT PRIMARY KEY,
                pw_hash       TEXT NOT NULL,
                salt          TEXT NOT NULL,
                nickname      TEXT NOT NULL UNIQUE,
                report_count  INTEGER NOT NULL DEFAULT 0,
                is_suspended  INTEGER NOT NULL DEFAULT 0,
                wins          INTEGER NOT NULL DEFAULT 0,
                losses        INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 비밀번호 + Salt 해시 (hex 인코딩)
    fn hash_password(password: &str, salt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hasher.update(salt.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// 아이디 존재 여부 확인
    pub async fn check_id_exists(&self, id: &str) -> ServerResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("cnt")?;
        Ok(count > 0)
    }

    /// 회원가입
    ///
    /// 아이디와 닉네임 양쪽 모두 중복 검사 후 삽입합니다.
    pub async fn signup(&self, id: &str, pw: &str, nickname: &str) -> ServerResult<SignupOutcome> {
        let mut tx = self.pool.begin().await?;

        let dup = sqlx::query("SELECT id FROM users WHERE id = ? OR nickname = ?")
            .bind(id)
            .bind(nickname)
            .fetch_optional(&mut *tx)
            .await?;

        if dup.is_some() {
            return Ok(SignupOutcome::Duplicate);
        }

        let salt = SimpleUtils::generate_salt();
        let pw_hash = Self::hash_password(pw, &salt);

        sqlx::query(
            "INSERT INTO users (id, pw_hash, salt, nickname, report_count, is_suspended, wins, losses) \
             VALUES (?, ?, ?, ?, 0, 0, 0, 0)",
        )
        .bind(id)
        .bind(&pw_hash)
        .bind(&salt)
        .bind(nickname)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("사용자 생성 성공: {}", id);
        Ok(SignupOutcome::Success)
    }

    /// 로그인
    ///
    /// 정지 여부를 비밀번호보다 먼저 확인합니다.
    pub async fn login(&self, id: &str, pw: &str) -> ServerResult<LoginOutcome> {
        let row = sqlx::query("SELECT pw_hash, salt, is_suspended FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(LoginOutcome::NoAccount),
        };

        let stored_hash: String = row.try_get("pw_hash")?;
        let salt: String = row.try_get("salt")?;
        let is_suspended: i64 = row.try_get("is_suspended")?;

        if is_suspended != 0 {
            return Ok(LoginOutcome::Suspended);
        }

        if Self::hash_password(pw, &salt) != stored_hash {
            return Ok(LoginOutcome::WrongPassword);
        }

        match self.lookup_profile(id).await? {
            Some(record) => Ok(LoginOutcome::Success(record)),
            None => Ok(LoginOutcome::NoAccount),
        }
    }

    /// 프로필 조회
    pub async fn lookup_profile(&self, id: &str) -> ServerResult<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT id, nickname, report_count, is_suspended, wins, losses FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        Ok(Some(UserRecord {
            id: row.try_get("id")?,
            nickname: row.try_get("nickname")?,
            report_count: row.try_get("report_count")?,
            is_suspended: row.try_get::<i64, _>("is_suspended")? != 0,
            wins: row.try_get("wins")?,
            losses: row.try_get("losses")?,
        }))
    }

    /// 사용자 신고
    ///
    /// 닉네임으로 대상의 신고 횟수를 올리고, 누적 5회에 도달하면
    /// 자동으로 계정을 정지합니다.
    pub async fn report(&self, nickname: &str) -> ServerResult<ReportOutcome> {
        let result = sqlx::query("UPDATE users SET report_count = report_count + 1 WHERE nickname = ?")
            .bind(nickname)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(ReportOutcome::NotFound);
        }

        let row = sqlx::query("SELECT report_count, is_suspended FROM users WHERE nickname = ?")
            .bind(nickname)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("report_count")?;
        let already_suspended: i64 = row.try_get("is_suspended")?;

        let mut suspended = false;
        if count >= SUSPEND_REPORT_COUNT && already_suspended == 0 {
            sqlx::query("UPDATE users SET is_suspended = 1 WHERE nickname = ?")
                .bind(nickname)
                .execute(&self.pool)
                .await?;
            suspended = true;

            warn!("신고 누적으로 계정 정지: {} ({}회)", nickname, count);
        }

        Ok(ReportOutcome::Reported { count, suspended })
    }

    /// 게임 전적 저장
    ///
    /// 대상 닉네임이 없으면 false 를 반환합니다.
    pub async fn save_result(&self, nickname: &str, result: MatchResult) -> ServerResult<bool> {
        let sql = match result {
            MatchResult::Win => "UPDATE users SET wins = wins + 1 WHERE nickname = ?",
            MatchResult::Loss => "UPDATE users SET losses = losses + 1 WHERE nickname = ?",
        };

        let query_result = sqlx::query(sql).bind(nickname).execute(&self.pool).await?;

        if query_result.rows_affected() == 0 {
            error!("전적 저장 실패 - 닉네임 없음: {}", nickname);
            return Ok(false);
        }

        info!("전적 저장: {} - {}", nickname, result.as_str());
        Ok(true)
    }

    /// 닉네임 변경
    pub async fn change_nickname(&self, id: &str, new_nickname: &str) -> ServerResult<RenameOutcome> {
        let dup = sqlx::query("SELECT id FROM users WHERE nickname = ? AND id != ?")
            .bind(new_nickname)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if dup.is_some() {
            return Ok(RenameOutcome::Duplicate);
        }

        let result = sqlx::query("UPDATE users SET nickname = ? WHERE id = ?")
            .bind(new_nickname)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(RenameOutcome::NotFound);
        }

        Ok(RenameOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 테스트마다 고유한 임시 DB 파일로 서비스를 만든다.
    async fn test_service(name: &str) -> AccountService {
        let path = std::env::temp_dir().join(format!(
            "codenames_accounts_{}_{}.db",
            name,
            SimpleUtils::random_alnum(8)
        ));
        let _ = std::fs::remove_file(&path);
        AccountService::connect(path.to_str().unwrap()).await.unwrap()
    }

    /// 가입 후 로그인 왕복 테스트
    #[tokio::test]
    async fn test_signup_then_login() {
        let service = test_service("signup_login").await;

        let outcome = service.signup("alice", "pw1", "Alice").await.unwrap();
        assert_eq!(outcome, SignupOutcome::Success);

        match service.login("alice", "pw1").await.unwrap() {
            LoginOutcome::Success(record) => {
                assert_eq!(record.id, "alice");
                assert_eq!(record.nickname, "Alice");
                assert_eq!(record.wins, 0);
                assert!(!record.is_suspended);
            }
            other => panic!("로그인 실패: {:?}", other),
        }
    }

    /// 중복 가입 테스트 (아이디/닉네임 각각)
    #[tokio::test]
    async fn test_signup_duplicate() {
        let service = test_service("signup_dup").await;
        service.signup("alice", "pw1", "Alice").await.unwrap();

        let same_id = service.signup("alice", "pw2", "Other").await.unwrap();
        assert_eq!(same_id, SignupOutcome::Duplicate);

        let same_nick = service.signup("bob", "pw2", "Alice").await.unwrap();
        assert_eq!(same_nick, SignupOutcome::Duplicate);
    }

    /// 로그인 실패 케이스 테스트
    #[tokio::test]
    async fn test_login_failures() {
        let service = test_service("login_fail").await;
        service.signup("alice", "pw1", "Alice").await.unwrap();

        assert!(matches!(
            service.login("nobody", "pw").await.unwrap(),
            LoginOutcome::NoAccount
        ));
        assert!(matches!(
            service.login("alice", "wrong").await.unwrap(),
            LoginOutcome::WrongPassword
        ));
    }

    /// 아이디 존재 확인 테스트
    #[tokio::test]
    async fn test_check_id_exists() {
        let service = test_service("check_id").await;

        assert!(!service.check_id_exists("alice").await.unwrap());
        service.signup("alice", "pw1", "Alice").await.unwrap();
        assert!(service.check_id_exists("alice").await.unwrap());
    }

    /// 신고 5회 누적 시 자동 정지 테스트
    #[tokio::test]
    async fn test_report_auto_suspend() {
        let service = test_service("report").await;
        service.signup("alice", "pw1", "Alice").await.unwrap();

        for i in 1..SUSPEND_REPORT_COUNT {
            match service.report("Alice").await.unwrap() {
                ReportOutcome::Reported { count, suspended } => {
                    assert_eq!(count, i);
                    assert!(!suspended);
                }
                other => panic!("신고 실패: {:?}", other),
            }
        }

        // 5번째 신고에서 정지
        match service.report("Alice").await.unwrap() {
            ReportOutcome::Reported { count, suspended } => {
                assert_eq!(count, SUSPEND_REPORT_COUNT);
                assert!(suspended);
            }
            other => panic!("신고 실패: {:?}", other),
        }

        assert!(matches!(
            service.login("alice", "pw1").await.unwrap(),
            LoginOutcome::Suspended
        ));

        // 없는 닉네임 신고
        assert_eq!(service.report("Nobody").await.unwrap(), ReportOutcome::NotFound);
    }

    /// 전적 저장 테스트
    #[tokio::test]
    async fn test_save_result() {
        let service = test_service("save_result").await;
        service.signup("alice", "pw1", "Alice").await.unwrap();

        assert!(service.save_result("Alice", MatchResult::Win).await.unwrap());
        assert!(service.save_result("Alice", MatchResult::Loss).await.unwrap());
        assert!(!service.save_result("Nobody", MatchResult::Win).await.unwrap());

        let record = service.lookup_profile("alice").await.unwrap().unwrap();
        assert_eq!(record.wins, 1);
        assert_eq!(record.losses, 1);
    }

    /// 닉네임 변경 테스트
    #[tokio::test]
    async fn test_change_nickname() {
        let service = test_service("rename").await;
        service.signup("alice", "pw1", "Alice").await.unwrap();
        service.signup("bob", "pw2", "Bob").await.unwrap();

        assert_eq!(
            service.change_nickname("alice", "Alicia").await.unwrap(),
            RenameOutcome::Success
        );
        assert_eq!(
            service.change_nickname("alice", "Bob").await.unwrap(),
            RenameOutcome::Duplicate
        );
        assert_eq!(
            service.change_nickname("nobody", "X").await.unwrap(),
            RenameOutcome::NotFound
        );

        let record = service.lookup_profile("alice").await.unwrap().unwrap();
        assert_eq!(record.nickname, "Alicia");
    }
}
