//! Subcommand implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use finalpoint_core::agent::{AgentServices, FetchResponse, NotificationClick, WorkerState};
use finalpoint_core::api::ApiClient;
use finalpoint_core::auth::TokenStore;
use finalpoint_core::clock::SystemClock;
use finalpoint_core::platform::{HttpNetwork, Network};
use finalpoint_core::prompt::{PermissionFlow, TriggerUpdate};
use finalpoint_core::refresh::{refresh_once, SubscriptionRefreshService};
use finalpoint_core::storage::{CacheStorage, DiskCacheStorage, JsonFileStore, KeyValueStore};
use finalpoint_core::{
    Agent, AgentEvent, AgentHost, Config, DismissStrategy, EventOutcome, Method, NotificationPrompt,
    Request, Url,
};
use tracing::{debug, info};

use crate::cli::{EnterArgs, FetchArgs};
use crate::host::{FilePushManager, StdinPrompter, TerminalNotifier, TerminalScope};

/// Keychain account used when none has been configured.
const DEFAULT_ACCOUNT: &str = "default";

/// Host-side store file (permission decision, last subscription).
const HOST_STORE_FILE: &str = "host.json";

pub struct Context {
    pub config: Config,
}

impl Context {
    pub fn load() -> Result<Self> {
        let mut config = Config::load()?;
        config.apply_env();
        debug!(origin = ?config.origin, api = config.api_base_url(), "Loaded config");
        Ok(Self { config })
    }

    /// Each invocation is a fresh process, so the agent is started in the
    /// lifecycle state the command expects it to be in.
    fn host(&self, state: WorkerState) -> Result<AgentHost> {
        let origin = self.config.origin_url()?;
        let caches = DiskCacheStorage::new(self.config.cache_dir()?)
            .context("Failed to open cache storage")?;
        let network = HttpNetwork::new(origin).context("Failed to build network client")?;

        let services = AgentServices {
            caches: Arc::new(caches),
            network: Arc::new(network),
            notifier: Arc::new(TerminalNotifier),
            scope: Arc::new(TerminalScope),
        };
        let agent = Agent::new(self.config.agent_config()?, services).with_state(state);
        Ok(AgentHost::new(agent))
    }

    fn prompt_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        let path = self.config.storage_path()?;
        Ok(Arc::new(JsonFileStore::open(path).context("Failed to open prompt storage")?))
    }

    fn host_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        let path = self.config.storage_path()?.with_file_name(HOST_STORE_FILE);
        Ok(Arc::new(JsonFileStore::open(path).context("Failed to open host storage")?))
    }

    fn prompt(&self) -> Result<NotificationPrompt> {
        Ok(NotificationPrompt::new(self.prompt_store()?, Arc::new(SystemClock)))
    }

    fn account(&self) -> &str {
        self.config.account.as_deref().unwrap_or(DEFAULT_ACCOUNT)
    }

    fn api_client(&self) -> Result<ApiClient> {
        let client = ApiClient::new(self.config.api_base_url())?;
        Ok(match TokenStore::find(self.account()) {
            Some(token) => client.with_token(token),
            None => {
                info!("No API token stored, registering anonymously");
                client
            }
        })
    }

    fn resolve(&self, url: &str) -> Result<Url> {
        match Url::parse(url) {
            Ok(url) => Ok(url),
            Err(_) => self
                .config
                .origin_url()?
                .join(url)
                .with_context(|| format!("Invalid URL: {}", url)),
        }
    }
}

// ===== Lifecycle =====

pub async fn install(ctx: &Context) -> Result<()> {
    let host = ctx.host(WorkerState::Parsed)?;
    match host.agent().dispatch(AgentEvent::Install).await? {
        EventOutcome::Installed { seeded: true } => println!("Installed, application shell cached"),
        _ => println!("Installed, application shell could not be cached"),
    }
    Ok(())
}

pub async fn activate(ctx: &Context) -> Result<()> {
    let host = ctx.host(WorkerState::Installed)?;
    print_activation(host.agent().dispatch(AgentEvent::Activate).await?);
    Ok(())
}

pub async fn boot(ctx: &Context) -> Result<()> {
    let host = ctx.host(WorkerState::Parsed)?;
    let (installed, activated) = host.boot().await?;
    if let EventOutcome::Installed { seeded } = installed {
        println!("Installed (shell cached: {})", seeded);
    }
    print_activation(activated);
    Ok(())
}

fn print_activation(outcome: EventOutcome) {
    if let EventOutcome::Activated { deleted } = outcome {
        if deleted.is_empty() {
            println!("Activated, no caches to remove");
        } else {
            println!("Activated, removed {} cache(s):", deleted.len());
            for name in deleted {
                println!("  {}", name);
            }
        }
    }
}

// ===== Functional events =====

pub async fn fetch(ctx: &Context, args: &FetchArgs) -> Result<()> {
    let url = ctx.resolve(&args.url)?;
    let method = Method::parse(&args.method)
        .with_context(|| format!("Unsupported method: {}", args.method))?;
    let request = if args.navigate {
        Request::navigate(url)
    } else {
        Request::get(url)
    }
    .with_method(method);

    let host = ctx.host(WorkerState::Activated)?;
    let (source, response) = match host.spawn(AgentEvent::Fetch(request.clone())).await?? {
        EventOutcome::Fetch(FetchResponse::FromCache(r)) => ("cache", r),
        EventOutcome::Fetch(FetchResponse::FromNetwork(r)) => ("network", r),
        _ => ("passthrough", host.agent().network().fetch(&request).await?),
    };

    println!(
        "{} {} {} ({}, {:?}, {} bytes)",
        request.method,
        response.status,
        response.status_text,
        source,
        response.response_type,
        response.body.len()
    );
    if args.body {
        println!("{}", String::from_utf8_lossy(&response.body));
    }
    Ok(())
}

pub async fn push(ctx: &Context, payload: Option<String>) -> Result<()> {
    let host = ctx.host(WorkerState::Activated)?;
    let data = payload.map(String::into_bytes);
    if let Some(EventOutcome::Push { displayed: false, .. }) =
        host.deliver(AgentEvent::Push(data)).await
    {
        println!("Notification could not be displayed");
    }
    Ok(())
}

pub async fn click(ctx: &Context, tag: String, action: Option<String>) -> Result<()> {
    let host = ctx.host(WorkerState::Activated)?;
    let click = NotificationClick::new(tag, action.as_deref());
    if let EventOutcome::NotificationClick { opened: None } =
        host.agent().dispatch(AgentEvent::NotificationClick(click)).await?
    {
        println!("Notification closed");
    }
    Ok(())
}

pub async fn message(ctx: &Context, json: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(json).context("Message is not valid JSON")?;
    let host = ctx.host(WorkerState::Activated)?;
    let outcome = host.agent().dispatch(AgentEvent::Message(value)).await?;
    if let EventOutcome::Message(outcome) = outcome {
        println!("{:?}", outcome);
    }
    Ok(())
}

pub async fn sync(ctx: &Context, tag: String) -> Result<()> {
    let host = ctx.host(WorkerState::Activated)?;
    host.agent().dispatch(AgentEvent::Sync { tag }).await?;
    Ok(())
}

pub async fn caches(ctx: &Context) -> Result<()> {
    let storage = DiskCacheStorage::new(ctx.config.cache_dir()?)?;
    let summaries = storage.summaries().await?;
    if summaries.is_empty() {
        println!("No caches in {}", storage.cache_dir().display());
        return Ok(());
    }
    for summary in summaries {
        println!(
            "{:<24} {:>5} entries  updated {}",
            summary.name,
            summary.entries,
            summary.age_display()
        );
    }
    Ok(())
}

// ===== Prompt =====

pub fn prompt_status(ctx: &Context) -> Result<()> {
    let prompt = ctx.prompt()?;
    println!("Shown before:     {}", prompt.has_been_shown());
    match prompt.dismissed_until() {
        Some(until) => println!("Suppressed until: {}", until.to_rfc3339()),
        None => println!("Suppressed until: -"),
    }
    Ok(())
}

pub fn prompt_dismiss(ctx: &Context, strategy: DismissStrategy) -> Result<()> {
    let until = ctx.prompt()?.dismiss_prompt(strategy)?;
    println!("Prompt hidden until {}", until.to_rfc3339());
    Ok(())
}

pub fn prompt_enter(ctx: &Context, args: &EnterArgs) -> Result<()> {
    let mut prompt = ctx.prompt()?;
    prompt.enter_route(&args.route);
    prompt.update(TriggerUpdate {
        has_joined_league: args.joined_league.then_some(true),
        has_recent_score_update: args.score_update.then_some(true),
        has_upcoming_race: args.race_in.map(|_| true),
        days_until_race: args.race_in,
        ..Default::default()
    });

    if !prompt.should_show_prompt() {
        match prompt.dismissed_until() {
            Some(until) => println!("No prompt (suppressed until {})", until.to_rfc3339()),
            None => println!("No prompt"),
        }
        return Ok(());
    }
    if let Some(reason) = prompt.prompt_reason() {
        println!("{}\n{}", reason.title(), reason.message());
    }
    Ok(())
}

pub fn prompt_reset(ctx: &Context) -> Result<()> {
    ctx.prompt()?.reset()?;
    println!("Prompt state cleared");
    Ok(())
}

// ===== Subscriptions =====

pub async fn subscribe(ctx: &Context, subscription: PathBuf) -> Result<()> {
    let host_store = ctx.host_store()?;
    let flow = PermissionFlow::new(
        Arc::new(StdinPrompter::new(host_store.clone())),
        Arc::new(FilePushManager::new(Some(subscription), host_store)),
        Arc::new(ctx.api_client()?),
        ctx.config.vapid_public_key.clone(),
    );

    let outcome = flow.enable_notifications().await;
    ctx.prompt()?.record_permission_result(&outcome)?;
    println!("{:?}", outcome);
    Ok(())
}

pub async fn refresh(ctx: &Context, watch: bool) -> Result<()> {
    let host_store = ctx.host_store()?;
    let prompter = Arc::new(StdinPrompter::new(host_store.clone()));
    let push = Arc::new(FilePushManager::new(None, host_store));
    let sink = Arc::new(ctx.api_client()?);

    if !watch {
        let refreshed = refresh_once(prompter.as_ref(), push.as_ref(), sink.as_ref()).await;
        println!(
            "{}",
            if refreshed {
                "Subscription refreshed"
            } else {
                "Nothing to refresh"
            }
        );
        return Ok(());
    }

    let service = SubscriptionRefreshService::new(prompter, push, sink);
    service.initialize();
    println!("Refreshing subscription periodically, Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    service.teardown();
    Ok(())
}

// ===== Account =====

pub fn login(ctx: &mut Context, account: Option<String>) -> Result<()> {
    let account = account.unwrap_or_else(|| ctx.account().to_string());
    let token = rpassword::prompt_password(format!("API token for {}: ", account))
        .context("Failed to read token")?;
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("Token must not be empty");
    }

    TokenStore::store(&account, token)?;
    ctx.config.account = Some(account.clone());
    ctx.config.save()?;
    println!("Token stored for {}", account);
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    let account = ctx.account();
    if !TokenStore::has_token(account) {
        println!("No token stored for {}", account);
        return Ok(());
    }
    TokenStore::delete(account)?;
    println!("Token removed for {}", account);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_urls_against_origin() {
        let mut config = Config::default();
        config.origin = Some("http://localhost:8080".to_string());
        let ctx = Context { config };

        assert_eq!(
            ctx.resolve("/leagues/4").unwrap().as_str(),
            "http://localhost:8080/leagues/4"
        );
        assert_eq!(
            ctx.resolve("https://finalpoint.app/").unwrap().as_str(),
            "https://finalpoint.app/"
        );
    }

    #[test]
    fn test_default_account() {
        let ctx = Context {
            config: Config::default(),
        };
        assert_eq!(ctx.account(), DEFAULT_ACCOUNT);
    }
}
