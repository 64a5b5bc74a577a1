//! Dry-run dispatch: spec §4.3 "Dry-run mode" — steps 1-7 run exactly as in
//! a live send except step 5 returns synthetic results after a uniform
//! random delay, `providerMessageId` prefixed `dry-run-`. Rate limiting
//! still applies, so this never substitutes for a real token acquisition.

use {crate::DispatchResult, model::RecipientId, rand::Rng};

const DRY_RUN_LATENCY_MIN_MS: u64 = 50;
const DRY_RUN_LATENCY_MAX_MS: u64 = 300;

pub async fn synthetic_results(recipient_ids: &[RecipientId]) -> Vec<DispatchResult> {
    let delay_ms = rand::thread_rng().gen_range(DRY_RUN_LATENCY_MIN_MS..=DRY_RUN_LATENCY_MAX_MS);
    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
    recipient_ids
        .iter()
        .map(|&recipient_id| DispatchResult {
            recipient_id,
            success: true,
            provider_message_id: Some(format!("dry-run-{}", uuid::Uuid::new_v4())),
            error: None,
        })
        .collect()
}
