mod support;

use chat_provider::ProviderError;
use ollama_chat::{
    AuthError, AuthGate, AuthState, ChatController, ConversationStore, KeyValueMedium,
    MemoryMedium, TurnError, TurnOutcome, CREDENTIAL_KEY,
};
use support::{ObservedCall, ScriptedProvider};

fn credential_of(call: &ObservedCall) -> Option<&str> {
    match call {
        ObservedCall::Chat { credential, .. } | ObservedCall::ListModels { credential } => {
            credential.as_deref()
        }
        ObservedCall::AuthRequired => None,
    }
}

#[tokio::test]
async fn open_backend_needs_no_prompt_and_attaches_no_credential() {
    let provider = ScriptedProvider::new();
    provider.push_auth(Ok(false));
    provider.push_reply("hi");
    provider.push_chat(Err(ProviderError::Transport("no title".to_string())));

    let (store, _) = ConversationStore::open(MemoryMedium::new());
    let mut auth = AuthGate::new(MemoryMedium::new());
    assert_eq!(auth.detect(&provider).await, AuthState::Open);
    assert_eq!(auth.credential(), None);

    let mut controller = ChatController::new(store, auth, "llama3");
    controller
        .send(&provider, "hello")
        .await
        .expect("send should be accepted");

    for call in provider.calls() {
        assert_eq!(credential_of(&call), None, "no call may carry a credential");
    }
}

#[tokio::test]
async fn detection_failure_fails_closed() {
    let provider = ScriptedProvider::new();
    provider.push_auth(Err(ProviderError::Transport("connection refused".to_string())));

    let mut auth = AuthGate::new(MemoryMedium::new());
    assert_eq!(auth.detect(&provider).await, AuthState::AwaitingCredential);
    assert!(!auth.allows_session_ops());

    let (store, _) = ConversationStore::open(MemoryMedium::new());
    let mut controller = ChatController::new(store, auth, "llama3");
    assert!(matches!(
        controller.begin_turn("hello"),
        Err(TurnError::AuthRequired)
    ));
}

#[tokio::test]
async fn stored_credential_validates_silently_and_is_attached() {
    let provider = ScriptedProvider::new();
    provider.push_auth(Ok(true));
    provider.push_models(Ok(vec!["llama3".to_string()]));
    provider.push_reply("hi");
    provider.push_chat(Err(ProviderError::Transport("no title".to_string())));

    let medium = MemoryMedium::new().with_value(CREDENTIAL_KEY, "stored-token");
    let mut auth = AuthGate::new(medium);
    assert_eq!(auth.detect(&provider).await, AuthState::Unlocked);
    assert_eq!(auth.credential(), Some("stored-token"));

    let (store, _) = ConversationStore::open(MemoryMedium::new());
    let mut controller = ChatController::new(store, auth, "llama3");
    controller
        .send(&provider, "hello")
        .await
        .expect("send should be accepted");

    let chat_calls = provider.chat_calls();
    assert_eq!(chat_calls.len(), 2, "turn and title upgrade");
    assert!(chat_calls
        .iter()
        .all(|call| credential_of(call) == Some("stored-token")));
}

#[tokio::test]
async fn failed_silent_validation_discards_the_stored_credential() {
    let provider = ScriptedProvider::new();
    provider.push_auth(Ok(true));
    provider.push_models(Err(ProviderError::CredentialRejected("expired".to_string())));

    let medium = MemoryMedium::new().with_value(CREDENTIAL_KEY, "stale-token");
    let mut auth = AuthGate::new(medium);

    assert_eq!(auth.detect(&provider).await, AuthState::AwaitingCredential);
    assert_eq!(auth.credential(), None);
    assert!(!auth.medium().contains(CREDENTIAL_KEY));
}

#[tokio::test]
async fn empty_candidate_is_rejected_without_a_network_call() {
    let provider = ScriptedProvider::new();
    provider.push_auth(Ok(true));

    let mut auth = AuthGate::new(MemoryMedium::new());
    auth.detect(&provider).await;
    let calls_after_detection = provider.network_call_count();

    assert_eq!(
        auth.submit_credential(&provider, "   ").await,
        Err(AuthError::EmptyCredential)
    );
    assert_eq!(auth.state(), AuthState::AwaitingCredential);
    assert_eq!(provider.network_call_count(), calls_after_detection);
}

#[tokio::test]
async fn rejected_candidate_is_not_stored() {
    let provider = ScriptedProvider::new();
    provider.push_auth(Ok(true));
    provider.push_models(Err(ProviderError::CredentialRejected("bad token".to_string())));

    let mut auth = AuthGate::new(MemoryMedium::new());
    auth.detect(&provider).await;

    let error = auth
        .submit_credential(&provider, "wrong")
        .await
        .expect_err("rejected candidate should fail");
    assert!(matches!(error, AuthError::InvalidCredential(_)));
    assert_eq!(auth.state(), AuthState::AwaitingCredential);
    assert!(!auth.medium().contains(CREDENTIAL_KEY));
}

#[tokio::test]
async fn probe_transport_failure_keeps_awaiting_without_storing() {
    let provider = ScriptedProvider::new();
    provider.push_auth(Ok(true));
    provider.push_models(Err(ProviderError::Transport("connection reset".to_string())));

    let mut auth = AuthGate::new(MemoryMedium::new());
    auth.detect(&provider).await;

    let error = auth
        .submit_credential(&provider, "maybe-valid")
        .await
        .expect_err("probe failure should surface");
    assert!(matches!(error, AuthError::Probe(_)));
    assert_eq!(auth.state(), AuthState::AwaitingCredential);
    assert!(!auth.medium().contains(CREDENTIAL_KEY));
}

#[tokio::test]
async fn accepted_candidate_is_stored_durably_and_unlocks() {
    let provider = ScriptedProvider::new();
    provider.push_auth(Ok(true));
    provider.push_models(Ok(vec!["llama3".to_string()]));

    let mut auth = AuthGate::new(MemoryMedium::new());
    auth.detect(&provider).await;

    auth.submit_credential(&provider, "  fresh-token ")
        .await
        .expect("valid candidate should unlock");
    assert_eq!(auth.state(), AuthState::Unlocked);
    assert_eq!(auth.credential(), Some("fresh-token"));
    assert_eq!(
        auth.medium()
            .get(CREDENTIAL_KEY)
            .expect("slot should be readable")
            .as_deref(),
        Some("fresh-token")
    );
}

#[tokio::test]
async fn midsession_rejection_discards_the_credential_exactly_once() {
    let provider = ScriptedProvider::new();
    provider.push_auth(Ok(true));
    provider.push_models(Ok(vec!["llama3".to_string()]));
    provider.push_chat(Err(ProviderError::CredentialRejected(
        "token revoked".to_string(),
    )));

    let medium = MemoryMedium::new().with_value(CREDENTIAL_KEY, "soon-stale");
    let mut auth = AuthGate::new(medium);
    assert_eq!(auth.detect(&provider).await, AuthState::Unlocked);

    let (store, _) = ConversationStore::open(MemoryMedium::new());
    let mut controller = ChatController::new(store, auth, "llama3");
    let outcome = controller
        .send(&provider, "hello")
        .await
        .expect("send should be accepted");

    assert_eq!(outcome, TurnOutcome::SessionExpired);
    assert!(!controller.is_busy());
    assert_eq!(controller.auth().state(), AuthState::AwaitingCredential);
    assert!(!controller.auth().medium().contains(CREDENTIAL_KEY));

    // Already discarded; a second rejection report is a no-op.
    assert!(!controller.auth_mut().on_credential_rejected());

    // Further sends are blocked until a new credential is collected.
    assert!(matches!(
        controller.begin_turn("again"),
        Err(TurnError::AuthRequired)
    ));
}
