//! 신고 처리
//!
//! REPORT|token|targetNickname 은 로비와 게임 양쪽 상태에서
//! 허용됩니다. 결과는 신고자에게만 전송합니다.

use anyhow::Result;
use std::sync::Arc;
use tracing::error;

use crate::protocol::{packet, Record};
use crate::service::account_service::ReportOutcome;
use crate::service::AccountService;
use crate::session::Session;

/// REPORT 패킷 처리
///
/// 신고자의 토큰이 세션과 일치해야 하며, 대상은 닉네임으로
/// 찾습니다. 누적 5회 도달 시 응답에 SUSPENDED 표기가 붙습니다.
pub async fn handle_report(
    accounts: &Arc<AccountService>,
    session: &Arc<Session>,
    record: &Record,
) -> Result<()> {
    let token = record.field(0).unwrap_or_default();
    let target = record.field(1).unwrap_or_default();
    let own_token = session.token().await;

    if token.is_empty() || token != own_token {
        session.send(&Record::new(packet::INVALID_TOKEN)).await?;
        return Ok(());
    }

    if target.is_empty() {
        let reply = Record::with_fields(packet::REPORT_ERROR, &["EMPTY_TARGET"]);
        session.send(&reply).await?;
        return Ok(());
    }

    let reply = match accounts.report(target).await {
        Ok(ReportOutcome::Reported { count, suspended }) => {
            if suspended {
                Record::with_fields(
                    packet::REPORT_OK,
                    &[count.to_string(), packet::SUSPENDED.to_string()],
                )
            } else {
                Record::with_fields(packet::REPORT_OK, &[count.to_string()])
            }
        }
        Ok(ReportOutcome::NotFound) => Record::with_fields(packet::REPORT_ERROR, &["NOT_FOUND"]),
        Err(e) => {
            error!("신고 처리 실패: {}", e);
            Record::with_fields(packet::REPORT_ERROR, &["DB_ERROR"])
        }
    };

    session.send(&reply).await?;
    Ok(())
}
