//! Escenario F (§8.4): una sesión creada en t=0 todavía es legible en la
//! ventana de rezago (t=24h+1m) pero desaparece tras el barrido en t=26h.

use mediaflow_core::Session;
use mediaflow_store::SessionStore;

const HOUR: i64 = 60 * 60;

#[tokio::test]
async fn session_is_gone_only_after_the_sweep_crosses_its_ttl() {
    let store = SessionStore::new(24 * HOUR);
    store.put_session(&Session::new("s1".into(), "user-1".into(), None, 0), 0).await.unwrap();

    assert_eq!(store.sweep_expired(24 * HOUR - HOUR), 0);
    assert!(store.get_session("s1").await.is_ok());

    assert_eq!(store.sweep_expired(26 * HOUR), 1);
    assert!(store.get_session("s1").await.is_err());
}
