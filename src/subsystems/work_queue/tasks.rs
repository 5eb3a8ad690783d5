use anyhow::bail;
use strum_macros::Display;

use crate::{
    AppState,
    domain::order::{ReceiptArgs, send_purchase_receipt},
};

use super::queue::Task;

#[derive(Debug, Clone, Display, serde::Serialize, serde::Deserialize)]
pub enum TaskDomainArgs {
    SendPurchaseReceipt(ReceiptArgs),
    TestingFailure,
}

pub async fn handle_task(state: &AppState, task: Task) -> Result<(), anyhow::Error> {
    match task.domain_args {
        TaskDomainArgs::SendPurchaseReceipt(args) => {
            send_purchase_receipt(
                &state.pool,
                &state.mailer,
                &state.settings.application.base_url,
                args,
            )
            .await
        }
        TaskDomainArgs::TestingFailure => bail!("Failed as expected."),
    }
}
