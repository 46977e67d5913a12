//! Browser validator driven through scripted sessions.

mod common;

use common::*;
use pdf_trust::infra::config::MarkerConfig;
use pdf_trust::services::result_extractor::UNSIGNED_HINT;
use pdf_trust::{
    BrowserSignatureValidator, DocumentInput, FinalVerdict, RemoteSignatureValidator,
    ValidationError,
};
use tokio_util::sync::CancellationToken;

fn validator(factory: ScriptedFactory) -> BrowserSignatureValidator<ScriptedFactory> {
    BrowserSignatureValidator::new(factory, fast_validator_config(), MarkerConfig::default())
        .unwrap()
}

fn document() -> DocumentInput {
    DocumentInput::new("contrato.pdf", a4_pdf(1))
}

#[tokio::test(start_paused = true)]
async fn signed_document_is_validated() {
    let validator = validator(ScriptedFactory::settled(signed_markup()));
    let record = validator
        .validate(&document(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(record.signed);
    assert_eq!(record.signature_count, 1);
    assert!(record.authenticity_ok);
    assert!(record.integrity_ok);
    assert_eq!(record.final_verdict, FinalVerdict::Validated);
    assert_eq!(record.score, 100);
    assert_eq!(record.filename, "contrato.pdf");
    assert!(record.error_message.is_none());
}

#[tokio::test(start_paused = true)]
async fn unsigned_document_is_not_validated() {
    let validator = validator(ScriptedFactory::settled(unsigned_markup()));
    let record = validator
        .validate(&document(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!record.signed);
    assert_eq!(record.signature_count, 0);
    assert!(!record.authenticity_ok);
    assert!(!record.integrity_ok);
    assert_eq!(record.final_verdict, FinalVerdict::NotValidated);
    assert_eq!(record.error_message.as_deref(), Some(UNSIGNED_HINT));
}

#[tokio::test(start_paused = true)]
async fn markers_that_never_appear_yield_degraded_record() {
    let factory = ScriptedFactory::settled(pending_markup());
    let stats = factory.stats.clone();
    let validator = validator(factory);
    let record = validator
        .validate(&document(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(record.is_degraded());
    assert_ne!(record.final_verdict, FinalVerdict::Validated);
    assert_eq!(stats.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn transitional_markup_is_not_read() {
    let mut half_rendered = [true; 8];
    half_rendered[5] = false;
    let factory = ScriptedFactory::new(vec![
        None,
        Some(pending_markup()),
        Some(results_markup(half_rendered)),
        Some(signed_markup()),
    ]);
    let record = validator(factory)
        .validate(&document(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(record.final_verdict, FinalVerdict::Validated);
    assert!(!record.is_degraded());
}

#[tokio::test(start_paused = true)]
async fn half_rendered_markup_seen_twice_is_not_final() {
    let mut half_rendered = [true; 8];
    half_rendered[5] = false;
    let factory = ScriptedFactory::new(vec![
        Some(results_markup(half_rendered)),
        Some(results_markup(half_rendered)),
        Some(signed_markup()),
    ]);
    let record = validator(factory)
        .validate(&document(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(record.final_verdict, FinalVerdict::Validated);
    assert!(record.authenticity_ok && record.integrity_ok);
    assert!(!record.is_degraded());
}

#[tokio::test(start_paused = true)]
async fn missing_container_is_a_timeout() {
    let factory = ScriptedFactory::new(vec![None]);
    let stats = factory.stats.clone();
    let result = validator(factory)
        .validate(&document(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ValidationError::Timeout(_))));
    assert_eq!(stats.opened(), 1);
    assert_eq!(stats.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn navigation_failure_still_closes_session() {
    let factory = ScriptedFactory::failing_navigation(ValidationError::AutomationFailure(
        "net::ERR_NAME_NOT_RESOLVED".to_string(),
    ));
    let stats = factory.stats.clone();
    let result = validator(factory)
        .validate(&document(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ValidationError::AutomationFailure(_))));
    assert_eq!(stats.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn each_validation_opens_a_fresh_session() {
    let factory = ScriptedFactory::settled(signed_markup());
    let stats = factory.stats.clone();
    let validator = validator(factory);
    let cancel = CancellationToken::new();
    for _ in 0..3 {
        validator.validate(&document(), &cancel).await.unwrap();
    }

    assert_eq!(stats.opened(), 3);
    assert_eq!(stats.closed(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancelled_poll_is_reported_as_timeout() {
    let validator = validator(ScriptedFactory::settled(pending_markup()));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = validator.validate(&document(), &cancel).await;
    assert!(matches!(result, Err(ValidationError::Timeout(_))));
}

#[tokio::test]
#[ignore = "Requires a running WebDriver and network access to the validation authority"]
async fn live_authority_round_trip() {
    use pdf_trust::infra::config::ValidatorConfig;
    use pdf_trust::DriverPool;

    let mut config = ValidatorConfig::default();
    if let Ok(url) = std::env::var("PDF_TRUST_WEBDRIVER_URL") {
        config.webdriver_url = url;
    }
    let pool = DriverPool::start(config.clone()).await.unwrap();
    let validator =
        BrowserSignatureValidator::new(pool, config, MarkerConfig::default()).unwrap();

    let record = validator
        .validate(&document(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!record.signed);
    assert_eq!(record.final_verdict, FinalVerdict::NotValidated);

    validator.into_factory().shutdown().await.unwrap();
}
