use super::*;
use crate::{
    api::{self, ApiClient},
    channel::{AuthHub, AuthSubscription},
    navigation::MemoryNavigator,
    notify::{Level, Toast, Toasts},
    role::Permission,
    store::MemoryStore,
    token::{encode_unsigned, Claims},
};
use anyhow::{anyhow, Result};
use serde_json::json;
use std::{net::TcpListener, time::Duration};
use tokio::time::{sleep, timeout};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Tab {
    manager: Arc<SessionManager>,
    navigator: Arc<MemoryNavigator>,
    toasts: Arc<Toasts>,
}

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn open_tab(
    server: &MockServer,
    hub: &AuthHub,
    store: &Arc<MemoryStore>,
    route: &str,
) -> Result<Tab> {
    let config = Config::new(server.uri()).with_timeout(Duration::from_secs(5));
    let api = Arc::new(ApiClient::new(&config.api_base_url, config.request_timeout)?);
    let navigator = Arc::new(MemoryNavigator::new(route));
    let toasts = Arc::new(Toasts::new());
    let channel = hub.open(&config.channel_name);

    let manager = SessionManager::new(
        config,
        Collaborators {
            api,
            store: Arc::clone(store) as Arc<dyn CredentialStore>,
            navigator: Arc::clone(&navigator) as Arc<dyn Navigator>,
            notifier: Arc::clone(&toasts) as Arc<dyn Notifier>,
        },
        channel,
    );

    Ok(Tab {
        manager: Arc::new(manager),
        navigator,
        toasts,
    })
}

fn session_token(id: u64, actor_type: ActorType, admin: Option<bool>) -> Result<String> {
    Ok(encode_unsigned(&Claims {
        id,
        actor_type,
        admin,
    })?)
}

fn persist(store: &MemoryStore, token: &str, refresh: &str) -> Result<()> {
    let options = CookieOptions {
        max_age: Duration::from_secs(3600),
        path: "/".to_string(),
    };
    store.set("fazumbem.token", token, &options)?;
    store.set("fazumbem.refreshToken", refresh, &options)?;
    Ok(())
}

fn assert_no_credentials(store: &MemoryStore) -> Result<()> {
    assert_eq!(store.get("fazumbem.token")?, None);
    assert_eq!(store.get("fazumbem.refreshToken")?, None);
    Ok(())
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

async fn mount_profile(server: &MockServer, collection: &str, id: u64, bearer: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{collection}/{id}")))
        .and(header("Authorization", format!("Bearer {bearer}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": id,
                "email": "contato@larfeliz.org",
                "name": "Lar Feliz",
                "city": "São Paulo"
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer, token: &str, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(delay)
                .set_body_json(json!({
                    "data": {"token": token, "refreshToken": "refresh-token"}
                })),
        )
        .mount(server)
        .await;
}

async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..50 {
        if check() {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    check()
}

async fn drain_signals(inbox: &mut AuthSubscription) -> usize {
    let mut count = 0;
    while let Ok(Some(_)) = timeout(Duration::from_millis(200), inbox.recv()).await {
        count += 1;
    }
    count
}

fn password(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

#[tokio::test]
async fn load_session_without_token_makes_no_request() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let tab = open_tab(&server, &AuthHub::new(), &store, "/")?;

    tab.manager.load_session().await?;

    assert!(!tab.manager.is_authenticated());
    assert_eq!(request_count(&server).await, 0);
    assert!(tab.toasts.snapshot().is_empty());
    assert!(tab.navigator.pushed().is_empty());
    Ok(())
}

#[tokio::test]
async fn load_session_restores_institution() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = session_token(42, ActorType::Institution, None)?;
    mount_profile(&server, "institutions", 42, &token).await;

    let store = Arc::new(MemoryStore::new());
    persist(&store, &token, "refresh-token")?;
    let tab = open_tab(&server, &AuthHub::new(), &store, "/dashboard")?;

    tab.manager.load_session().await?;

    let user = tab
        .manager
        .current_user()
        .ok_or_else(|| anyhow!("expected a user"))?;
    assert_eq!(user.id(), 42);
    assert_eq!(user.role, Role::Institution);
    assert_eq!(user.permission, None);
    assert_eq!(user.profile.city.as_deref(), Some("São Paulo"));
    assert!(tab.navigator.pushed().is_empty());
    Ok(())
}

#[tokio::test]
async fn load_session_restores_admin_curator() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = session_token(7, ActorType::Curator, Some(true))?;
    mount_profile(&server, "curators", 7, &token).await;

    let store = Arc::new(MemoryStore::new());
    persist(&store, &token, "refresh-token")?;
    let tab = open_tab(&server, &AuthHub::new(), &store, "/dashboard")?;

    tab.manager.load_session().await?;

    let user = tab
        .manager
        .current_user()
        .ok_or_else(|| anyhow!("expected a user"))?;
    assert_eq!(user.role, Role::Curator);
    assert_eq!(user.permission, Some(Permission::Administrator));
    Ok(())
}

#[tokio::test]
async fn load_session_with_rejected_token_signs_out_everywhere() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/institutions/42"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Token expirado"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hub = AuthHub::new();
    let observer = hub.open("auth");
    let mut inbox = observer.subscribe();

    let store = Arc::new(MemoryStore::new());
    persist(&store, &session_token(42, ActorType::Institution, None)?, "r")?;
    let tab = open_tab(&server, &hub, &store, "/dashboard")?;

    let err = tab
        .manager
        .load_session()
        .await
        .err()
        .ok_or_else(|| anyhow!("expected error"))?;

    assert!(matches!(
        err,
        Error::Api(api::Error::Http { status: 401, .. })
    ));
    assert_eq!(
        tab.toasts.drain(),
        vec![Toast {
            level: Level::Error,
            message: "Token expirado".to_string()
        }]
    );
    assert!(!tab.manager.is_authenticated());
    assert_no_credentials(&store)?;
    assert_eq!(tab.navigator.pushed(), vec!["/"]);
    assert_eq!(drain_signals(&mut inbox).await, 1);
    Ok(())
}

#[tokio::test]
async fn load_session_with_malformed_token_fails_closed() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    persist(&store, "not-a-jwt", "r")?;
    let tab = open_tab(&server, &AuthHub::new(), &store, "/campaigns")?;

    let result = tab.manager.load_session().await;

    assert!(matches!(result, Err(Error::Token(_))));
    assert_eq!(request_count(&server).await, 0);
    assert_no_credentials(&store)?;
    assert!(!tab.manager.is_authenticated());
    assert!(tab.navigator.pushed().is_empty());
    assert_eq!(tab.toasts.snapshot().len(), 1);
    Ok(())
}

#[tokio::test]
async fn sign_in_institution_lands_on_dashboard_once() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = session_token(42, ActorType::Institution, None)?;
    mount_login(&server, &token, Duration::ZERO).await;
    mount_profile(&server, "institutions", 42, &token).await;

    let store = Arc::new(MemoryStore::new());
    let tab = open_tab(&server, &AuthHub::new(), &store, "/sign")?;

    let user = tab
        .manager
        .sign_in("a@b.com", &password("pw"), ActorType::Institution)
        .await?;

    assert_eq!(user.id(), 42);
    assert_eq!(user.role, Role::Institution);
    assert!(tab.manager.is_authenticated());
    assert_eq!(tab.navigator.pushed(), vec!["/dashboard"]);
    assert_eq!(
        tab.toasts.drain(),
        vec![Toast {
            level: Level::Success,
            message: SIGN_IN_SUCCESS.to_string()
        }]
    );
    assert_eq!(store.get("fazumbem.token")?, Some(token));
    assert_eq!(
        store.get("fazumbem.refreshToken")?,
        Some("refresh-token".to_string())
    );
    assert_eq!(store.path_of("fazumbem.token")?, Some("/".to_string()));
    Ok(())
}

#[tokio::test]
async fn sign_in_as_curator_fetches_curator_profile() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = session_token(5, ActorType::Curator, Some(false))?;
    mount_login(&server, &token, Duration::ZERO).await;
    mount_profile(&server, "curators", 5, &token).await;
    Mock::given(method("GET"))
        .and(path("/institutions/5"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let tab = open_tab(&server, &AuthHub::new(), &store, "/sign")?;

    let user = tab
        .manager
        .sign_in("ana@fazumbem.com.br", &password("pw"), ActorType::Curator)
        .await?;

    assert_eq!(user.role, Role::Curator);
    assert_eq!(user.permission, Some(Permission::User));
    Ok(())
}

#[tokio::test]
async fn sign_in_with_bad_credentials_persists_nothing() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "E-mail ou senha incorretos"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let tab = open_tab(&server, &AuthHub::new(), &store, "/sign")?;

    let result = tab
        .manager
        .sign_in("a@b.com", &password("wrong"), ActorType::Institution)
        .await;

    assert!(result.is_err());
    assert!(!tab.manager.is_authenticated());
    assert_no_credentials(&store)?;
    assert!(tab.navigator.pushed().is_empty());
    assert_eq!(
        tab.toasts.drain(),
        vec![Toast {
            level: Level::Error,
            message: "E-mail ou senha incorretos".to_string()
        }]
    );
    Ok(())
}

#[tokio::test]
async fn sign_in_requires_email_and_password() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let tab = open_tab(&server, &AuthHub::new(), &store, "/sign")?;

    let empty_email = tab
        .manager
        .sign_in("  ", &password("pw"), ActorType::Institution)
        .await;
    let empty_password = tab
        .manager
        .sign_in("a@b.com", &password(""), ActorType::Curator)
        .await;

    assert!(matches!(empty_email, Err(Error::InvalidCredentials)));
    assert!(matches!(empty_password, Err(Error::InvalidCredentials)));
    assert_eq!(request_count(&server).await, 0);
    assert_eq!(tab.toasts.snapshot().len(), 2);
    Ok(())
}

#[tokio::test]
async fn sign_in_profile_failure_persists_nothing() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = session_token(42, ActorType::Institution, None)?;
    mount_login(&server, &token, Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path("/institutions/42"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let tab = open_tab(&server, &AuthHub::new(), &store, "/sign")?;

    let result = tab
        .manager
        .sign_in("a@b.com", &password("pw"), ActorType::Institution)
        .await;

    assert!(matches!(
        result,
        Err(Error::Api(api::Error::Http { status: 500, .. }))
    ));
    assert!(!tab.manager.is_authenticated());
    assert_no_credentials(&store)?;
    assert_eq!(
        tab.toasts.drain(),
        vec![Toast {
            level: Level::Error,
            message: "Request failed.".to_string()
        }]
    );
    Ok(())
}

#[tokio::test]
async fn sign_in_rejects_profile_for_another_actor() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = session_token(42, ActorType::Institution, None)?;
    mount_login(&server, &token, Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path("/institutions/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": 43, "email": "outra@org.br", "name": "Outra"}
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let tab = open_tab(&server, &AuthHub::new(), &store, "/sign")?;

    let result = tab
        .manager
        .sign_in("a@b.com", &password("pw"), ActorType::Institution)
        .await;

    assert!(matches!(
        result,
        Err(Error::ProfileMismatch {
            expected: 42,
            found: 43
        })
    ));
    assert!(!tab.manager.is_authenticated());
    assert_no_credentials(&store)?;
    assert!(tab.navigator.pushed().is_empty());
    Ok(())
}

#[tokio::test]
async fn sign_up_sends_visitor_to_sign_in() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/institutions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 10}})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let tab = open_tab(&server, &AuthHub::new(), &store, "/signup")?;
    let data = SignUpData {
        email: "contato@larfeliz.org".to_string(),
        password: "pw".to_string(),
        password_confirmation: "pw".to_string(),
        name: "Lar Feliz".to_string(),
        cnpj: Some("12.345.678/0001-99".to_string()),
        ..SignUpData::default()
    };

    tab.manager.sign_up(&data).await?;

    assert_eq!(tab.navigator.pushed(), vec!["/sign"]);
    assert_eq!(
        tab.toasts.drain(),
        vec![Toast {
            level: Level::Success,
            message: SIGN_UP_SUCCESS.to_string()
        }]
    );
    assert!(!tab.manager.is_authenticated());
    assert_no_credentials(&store)?;
    Ok(())
}

#[tokio::test]
async fn sign_up_curator_failure_shows_server_message() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/curators"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "E-mail já cadastrado"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let tab = open_tab(&server, &AuthHub::new(), &store, "/signup")?;

    let result = tab.manager.sign_up_curator(&SignUpData::default()).await;

    assert!(result.is_err());
    assert!(tab.navigator.pushed().is_empty());
    assert_eq!(
        tab.toasts.drain(),
        vec![Toast {
            level: Level::Error,
            message: "E-mail já cadastrado".to_string()
        }]
    );
    Ok(())
}

#[tokio::test]
async fn sign_out_twice_matches_sign_out_once() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = session_token(42, ActorType::Institution, None)?;
    mount_profile(&server, "institutions", 42, &token).await;

    let store = Arc::new(MemoryStore::new());
    persist(&store, &token, "refresh-token")?;
    let tab = open_tab(&server, &AuthHub::new(), &store, "/dashboard")?;
    tab.manager.load_session().await?;
    assert!(tab.manager.is_authenticated());

    tab.manager.sign_out().await;
    let once = tab.manager.session();
    tab.manager.sign_out().await;

    assert_eq!(tab.manager.session(), once);
    assert!(!tab.manager.is_authenticated());
    assert_no_credentials(&store)?;
    assert_eq!(tab.navigator.pushed(), vec!["/"]);
    Ok(())
}

#[tokio::test]
async fn sign_out_on_public_route_does_not_navigate() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let tab = open_tab(&server, &AuthHub::new(), &store, "/campaigns/natal-solidario")?;

    tab.manager.sign_out().await;

    assert!(tab.navigator.pushed().is_empty());
    assert_eq!(request_count(&server).await, 0);
    Ok(())
}

#[tokio::test]
async fn sign_out_user_only_clears_local_state() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = session_token(42, ActorType::Institution, None)?;
    mount_profile(&server, "institutions", 42, &token).await;

    let hub = AuthHub::new();
    let observer = hub.open("auth");
    let mut inbox = observer.subscribe();

    let store = Arc::new(MemoryStore::new());
    persist(&store, &token, "refresh-token")?;
    let tab = open_tab(&server, &hub, &store, "/dashboard")?;
    tab.manager.load_session().await?;

    tab.manager.sign_out_user();

    assert!(!tab.manager.is_authenticated());
    assert_eq!(store.get("fazumbem.token")?, Some(token));
    assert!(tab.navigator.pushed().is_empty());
    assert_eq!(drain_signals(&mut inbox).await, 0);
    Ok(())
}

#[tokio::test]
async fn sign_out_reaches_sibling_tab_exactly_once() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = session_token(42, ActorType::Institution, None)?;
    Mock::given(method("GET"))
        .and(path("/institutions/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": 42, "email": "contato@larfeliz.org", "name": "Lar Feliz"}
        })))
        .mount(&server)
        .await;

    let hub = AuthHub::new();
    let observer = hub.open("auth");
    let mut inbox = observer.subscribe();

    let store = Arc::new(MemoryStore::new());
    persist(&store, &token, "refresh-token")?;

    let tab_a = open_tab(&server, &hub, &store, "/campaigns")?;
    let tab_b = open_tab(&server, &hub, &store, "/dashboard/campaigns")?;
    let tab_c = open_tab(&server, &hub, &store, "/institutions/lar-feliz")?;
    let listeners = [
        tab_a.manager.spawn_listener(),
        tab_b.manager.spawn_listener(),
        tab_c.manager.spawn_listener(),
    ];

    tab_b.manager.load_session().await?;
    tab_c.manager.load_session().await?;
    assert!(tab_b.manager.is_authenticated());
    assert!(tab_c.manager.is_authenticated());

    tab_a.manager.sign_out().await;

    let b = Arc::clone(&tab_b.manager);
    let c = Arc::clone(&tab_c.manager);
    assert!(eventually(|| !b.is_authenticated() && !c.is_authenticated()).await);

    // Private page redirects, public pages stay put.
    assert!(eventually(|| tab_b.navigator.pushed() == vec!["/"]).await);
    assert!(tab_c.navigator.pushed().is_empty());
    assert!(tab_a.navigator.pushed().is_empty());
    assert_no_credentials(&store)?;

    // Receivers do not re-broadcast.
    assert_eq!(drain_signals(&mut inbox).await, 1);

    for listener in listeners {
        listener.abort();
    }
    Ok(())
}

#[tokio::test]
async fn overlapping_sign_in_and_sign_out_apply_in_order() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = session_token(42, ActorType::Institution, None)?;
    mount_login(&server, &token, Duration::from_millis(300)).await;
    mount_profile(&server, "institutions", 42, &token).await;

    let store = Arc::new(MemoryStore::new());
    let tab = open_tab(&server, &AuthHub::new(), &store, "/sign")?;

    let manager = Arc::clone(&tab.manager);
    let sign_in = tokio::spawn(async move {
        manager
            .sign_in("a@b.com", &password("pw"), ActorType::Institution)
            .await
    });

    // Let the sign-in take the writer lock and block on the slow login.
    sleep(Duration::from_millis(50)).await;
    tab.manager.sign_out().await;

    let signed_in = sign_in.await?;
    assert!(signed_in.is_ok());
    assert!(!tab.manager.is_authenticated());
    assert_no_credentials(&store)?;
    assert_eq!(tab.navigator.pushed(), vec!["/dashboard", "/"]);
    Ok(())
}

#[tokio::test]
async fn load_session_with_mismatched_profile_fails_closed() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/curators/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": 43, "email": "outra@fazumbem.com.br", "name": "Outra"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hub = AuthHub::new();
    let observer = hub.open("auth");
    let mut inbox = observer.subscribe();

    let store = Arc::new(MemoryStore::new());
    persist(&store, &session_token(42, ActorType::Curator, Some(true))?, "r")?;
    let tab = open_tab(&server, &hub, &store, "/dashboard")?;

    let result = tab.manager.load_session().await;

    assert!(matches!(
        result,
        Err(Error::ProfileMismatch {
            expected: 42,
            found: 43
        })
    ));
    assert!(!tab.manager.is_authenticated());
    assert_no_credentials(&store)?;
    assert_eq!(tab.navigator.pushed(), vec!["/"]);
    assert_eq!(
        tab.toasts.drain(),
        vec![Toast {
            level: Level::Error,
            message: "Sessão inválida. Entre novamente.".to_string()
        }]
    );
    assert_eq!(drain_signals(&mut inbox).await, 1);
    Ok(())
}

#[tokio::test]
async fn derived_access_replaces_profile_fields_of_the_same_name() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let token = session_token(42, ActorType::Institution, None)?;
    Mock::given(method("GET"))
        .and(path("/institutions/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": 42,
                "email": "contato@larfeliz.org",
                "name": "Lar Feliz",
                "role": "admin",
                "permission": "superuser",
                "campaigns_count": 3
            }
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    persist(&store, &token, "refresh-token")?;
    let tab = open_tab(&server, &AuthHub::new(), &store, "/dashboard")?;
    tab.manager.load_session().await?;

    let user = tab
        .manager
        .current_user()
        .ok_or_else(|| anyhow!("expected a user"))?;
    assert!(!user.profile.extra.contains_key("role"));
    assert!(!user.profile.extra.contains_key("permission"));
    assert_eq!(user.profile.extra.get("campaigns_count"), Some(&json!(3)));

    let rendered = serde_json::to_string(&user)?;
    assert_eq!(rendered.matches("\"role\"").count(), 1);
    assert_eq!(rendered.matches("\"permission\"").count(), 1);
    assert!(rendered.contains("\"role\":\"institution\""));
    assert!(rendered.contains("\"permission\":null"));
    Ok(())
}

#[tokio::test]
async fn listener_stops_when_manager_is_dropped() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let hub = AuthHub::new();
    let store = Arc::new(MemoryStore::new());
    let observer = hub.open("auth");

    let tab = open_tab(&server, &hub, &store, "/dashboard")?;
    let listener = tab.manager.spawn_listener();
    assert_eq!(observer.post(AuthSignal::SignOut), 1);

    drop(tab);

    assert!(eventually(|| listener.is_finished()).await);
    assert_eq!(observer.post(AuthSignal::SignOut), 0);
    Ok(())
}

