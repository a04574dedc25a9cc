//! Generic plugin backed by one external service.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    async_trait::async_trait,
    serde_json::json,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Context, Error, Result},
    executor::{Executor, ExecutorFactory},
    plugin::{InitContext, Plugin, PluginDescription, PluginState},
    runtime_handle::RuntimeHandle,
    service::PluginService,
    trigger::{Trigger, TriggerFactory, TriggerSettings},
};

/// A plugin whose triggers and executors are built from factories over a
/// shared service.
///
/// Construction only records configuration. Connecting the service and
/// running the factories happens in [`Plugin::init`].
pub struct ServicePlugin<S: PluginService> {
    id: String,
    description: PluginDescription,
    required_capabilities: Vec<String>,
    prompts_dir: Option<PathBuf>,
    service: Arc<S>,
    executor_factories: Vec<ExecutorFactory<S>>,
    trigger_factories: Vec<TriggerFactory<S>>,
    executors: Vec<Arc<dyn Executor>>,
    triggers: Vec<Arc<dyn Trigger>>,
    state: PluginState,
    runtime: Option<RuntimeHandle>,
}

impl<S: PluginService> ServicePlugin<S> {
    pub fn new(id: impl Into<String>, service: S) -> Self {
        Self {
            id: id.into(),
            description: PluginDescription::default(),
            required_capabilities: Vec::new(),
            prompts_dir: None,
            service: Arc::new(service),
            executor_factories: Vec::new(),
            trigger_factories: Vec::new(),
            executors: Vec::new(),
            triggers: Vec::new(),
            state: PluginState::Constructed,
            runtime: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: PluginDescription) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn with_required_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.push(capability.into());
        self
    }

    #[must_use]
    pub fn with_prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompts_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_executor_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(Arc<S>, RuntimeHandle) -> Arc<dyn Executor> + Send + Sync + 'static,
    {
        self.executor_factories.push(Box::new(factory));
        self
    }

    #[must_use]
    pub fn with_trigger_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(Arc<S>, RuntimeHandle, &TriggerSettings) -> Arc<dyn Trigger> + Send + Sync + 'static,
    {
        self.trigger_factories.push(Box::new(factory));
        self
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    fn spawn_startup_notice(&self, context: &InitContext) {
        let service = Arc::clone(&self.service);
        let plugin = self.id.clone();
        let delay = context.notice_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match service.startup_notice().await {
                Ok(Some(notice)) => info!(plugin = %plugin, "{notice}"),
                Ok(None) => {},
                Err(e) => warn!(plugin = %plugin, error = %e, "startup notice failed"),
            }
        });
    }
}

#[async_trait]
impl<S: PluginService> Plugin for ServicePlugin<S> {
    fn id(&self) -> &str {
        &self.id
    }

    async fn description(&self) -> Result<String> {
        match &self.description {
            PluginDescription::Static(text) => Ok(text.clone()),
            PluginDescription::Template(name) => {
                let runtime = self
                    .runtime
                    .as_ref()
                    .ok_or(Error::RuntimeUnavailable)?
                    .get()?;
                let key = format!("{}/{name}", self.id);
                let rendered = runtime
                    .render_template(&key, &json!({ "plugin_id": self.id }))
                    .with_context(|| format!("rendering {key}"))?;
                Ok(rendered.trim().to_string())
            },
        }
    }

    fn required_capabilities(&self) -> &[String] {
        &self.required_capabilities
    }

    fn prompts_dir(&self) -> Option<&Path> {
        self.prompts_dir.as_deref()
    }

    fn state(&self) -> PluginState {
        self.state
    }

    fn triggers(&self) -> &[Arc<dyn Trigger>] {
        &self.triggers
    }

    fn executors(&self) -> &[Arc<dyn Executor>] {
        &self.executors
    }

    async fn init(&mut self, context: InitContext) -> Result<()> {
        if self.state != PluginState::Constructed {
            return Err(Error::AlreadyInitialized {
                plugin: self.id.clone(),
                state: self.state,
            });
        }
        self.state = PluginState::Initializing;
        debug!(plugin = %self.id, "initializing plugin");

        if let Err(e) = self.service.connect().await {
            self.state = PluginState::Failed;
            return Err(Error::service_startup(&self.id, e));
        }

        for factory in &self.executor_factories {
            let executor = factory(Arc::clone(&self.service), context.runtime.clone());
            debug!(plugin = %self.id, executor = executor.name(), "registered executor");
            self.executors.push(executor);
        }
        for factory in &self.trigger_factories {
            let trigger = factory(
                Arc::clone(&self.service),
                context.runtime.clone(),
                &context.trigger_settings,
            );
            debug!(plugin = %self.id, trigger = trigger.id(), "registered trigger");
            self.triggers.push(trigger);
        }

        self.spawn_startup_notice(&context);
        self.runtime = Some(context.runtime);
        self.state = PluginState::Running;
        info!(
            plugin = %self.id,
            executors = self.executors.len(),
            triggers = self.triggers.len(),
            "plugin initialized"
        );
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        match self.state {
            PluginState::Running => {},
            PluginState::Terminated => {
                return Err(Error::DoubleShutdown {
                    plugin: self.id.clone(),
                });
            },
            state => {
                return Err(Error::NotRunning {
                    plugin: self.id.clone(),
                    state,
                });
            },
        }
        self.state = PluginState::ShuttingDown;

        for trigger in &self.triggers {
            if let Err(e) = trigger.stop().await {
                warn!(plugin = %self.id, trigger = trigger.id(), error = %e, "failed to stop trigger");
            }
        }
        let disconnected = self.service.disconnect().await;

        self.triggers.clear();
        self.executors.clear();
        self.state = PluginState::Terminated;

        disconnected.map_err(|e| Error::service_shutdown(&self.id, e))?;
        info!(plugin = %self.id, "plugin shut down");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use serde_json::Value;

    use super::*;

    #[derive(Default)]
    struct FakeService {
        fail_connect: bool,
        connected: AtomicBool,
        disconnects: AtomicUsize,
        notices: AtomicUsize,
    }

    #[async_trait]
    impl PluginService for FakeService {
        async fn connect(&self) -> anyhow::Result<()> {
            if self.fail_connect {
                anyhow::bail!("gateway unreachable");
            }
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&self) -> anyhow::Result<()> {
            self.connected.store(false, Ordering::SeqCst);
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn startup_notice(&self) -> anyhow::Result<Option<String>> {
            self.notices.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("invite link unavailable")
        }
    }

    struct NamedExecutor(String);

    #[async_trait]
    impl Executor for NamedExecutor {
        fn name(&self) -> &str {
            &self.0
        }

        fn description(&self) -> &str {
            "test executor"
        }

        async fn execute(&self, input: Value) -> anyhow::Result<Value> {
            Ok(input)
        }
    }

    struct PrefixTrigger {
        id: &'static str,
        prefix: String,
        stopped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Trigger for PrefixTrigger {
        fn id(&self) -> &str {
            self.id
        }

        fn matches(&self, text: &str) -> bool {
            text.starts_with(&self.prefix)
        }

        async fn start(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn executor_factory(
        name: &'static str,
        calls: Arc<Mutex<Vec<&'static str>>>,
    ) -> impl Fn(Arc<FakeService>, RuntimeHandle) -> Arc<dyn Executor> + Send + Sync + 'static {
        move |_service, _runtime| -> Arc<dyn Executor> {
            calls.lock().unwrap().push(name);
            Arc::new(NamedExecutor(name.to_string()))
        }
    }

    fn context() -> InitContext {
        InitContext {
            notice_delay: Duration::from_millis(10),
            ..InitContext::new(RuntimeHandle::new())
        }
    }

    #[tokio::test]
    async fn executors_follow_declaration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut plugin = ServicePlugin::new("plugin-test", FakeService::default())
            .with_executor_factory(executor_factory("send_message", Arc::clone(&calls)))
            .with_executor_factory(executor_factory("reply", Arc::clone(&calls)));

        assert!(plugin.executors().is_empty());
        assert!(calls.lock().unwrap().is_empty());

        plugin.init(context()).await.unwrap();

        let names: Vec<&str> = plugin.executors().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["send_message", "reply"]);
        assert_eq!(*calls.lock().unwrap(), vec!["send_message", "reply"]);
        assert_eq!(plugin.state(), PluginState::Running);
        assert!(plugin.service().connected.load(Ordering::SeqCst));
        assert!(plugin.executor("reply").is_some());
    }

    #[tokio::test]
    async fn trigger_factories_receive_settings() {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        let mut plugin = ServicePlugin::new("plugin-test", FakeService::default())
            .with_trigger_factory(move |_service, _runtime, settings| -> Arc<dyn Trigger> {
                Arc::new(PrefixTrigger {
                    id: "prefix",
                    prefix: settings.command_prefix.clone(),
                    stopped: Arc::clone(&flag),
                })
            });

        let mut ctx = context();
        ctx.trigger_settings.command_prefix = "?".into();
        plugin.init(ctx).await.unwrap();

        assert!(plugin.match_trigger("?help").is_some());
        assert!(plugin.match_trigger("!help").is_none());

        plugin.shutdown().await.unwrap();
        assert!(stopped.load(Ordering::SeqCst));
        assert!(plugin.triggers().is_empty());
    }

    #[tokio::test]
    async fn triggers_follow_declaration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let stopped = Arc::new(AtomicBool::new(false));
        let mut plugin = ServicePlugin::new("plugin-test", FakeService::default());
        for id in ["first", "second"] {
            let calls = Arc::clone(&calls);
            let stopped = Arc::clone(&stopped);
            plugin = plugin.with_trigger_factory(
                move |_service, _runtime, settings| -> Arc<dyn Trigger> {
                    calls.lock().unwrap().push(id);
                    Arc::new(PrefixTrigger {
                        id,
                        prefix: settings.command_prefix.clone(),
                        stopped: Arc::clone(&stopped),
                    })
                },
            );
        }
        assert!(calls.lock().unwrap().is_empty());

        plugin.init(context()).await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
        let ids: Vec<&str> = plugin.triggers().iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert_eq!(plugin.match_trigger("!ping").unwrap().id(), "first");
    }

    #[tokio::test]
    async fn startup_failure_marks_plugin_failed() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let service = FakeService {
            fail_connect: true,
            ..Default::default()
        };
        let mut plugin = ServicePlugin::new("plugin-test", service)
            .with_executor_factory(executor_factory("reply", Arc::clone(&calls)));

        let err = plugin.init(context()).await.unwrap_err();
        assert!(matches!(err, Error::ServiceStartup { ref plugin, .. } if plugin == "plugin-test"));
        assert!(err.to_string().contains("gateway unreachable"));
        assert_eq!(plugin.state(), PluginState::Failed);
        assert!(plugin.executors().is_empty());
        assert!(calls.lock().unwrap().is_empty());

        let err = plugin.shutdown().await.unwrap_err();
        assert!(matches!(err, Error::NotRunning { state: PluginState::Failed, .. }));
    }

    #[tokio::test]
    async fn shutdown_before_init_is_rejected() {
        let mut plugin = ServicePlugin::new("plugin-test", FakeService::default());
        let err = plugin.shutdown().await.unwrap_err();
        assert!(matches!(err, Error::NotRunning { state: PluginState::Constructed, .. }));
        assert_eq!(plugin.service().disconnects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_shutdown_fails_loudly() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut plugin = ServicePlugin::new("plugin-test", FakeService::default())
            .with_executor_factory(executor_factory("reply", calls));
        plugin.init(context()).await.unwrap();

        plugin.shutdown().await.unwrap();
        assert_eq!(plugin.state(), PluginState::Terminated);
        assert!(plugin.executors().is_empty());

        let err = plugin.shutdown().await.unwrap_err();
        assert!(matches!(err, Error::DoubleShutdown { .. }));
        assert_eq!(plugin.service().disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn init_runs_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut plugin = ServicePlugin::new("plugin-test", FakeService::default())
            .with_executor_factory(executor_factory("reply", Arc::clone(&calls)));
        plugin.init(context()).await.unwrap();

        let err = plugin.init(context()).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized { state: PluginState::Running, .. }));
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(plugin.executors().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn startup_notice_does_not_block_init() {
        let mut plugin = ServicePlugin::new("plugin-test", FakeService::default());
        let ctx = InitContext {
            notice_delay: Duration::from_secs(60),
            ..InitContext::new(RuntimeHandle::new())
        };

        plugin.init(ctx).await.unwrap();
        assert_eq!(plugin.state(), PluginState::Running);
        assert_eq!(plugin.service().notices.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(plugin.service().notices.load(Ordering::SeqCst), 1);
        assert_eq!(plugin.state(), PluginState::Running);
    }

    #[tokio::test]
    async fn static_description_needs_no_runtime() {
        let plugin = ServicePlugin::new("plugin-test", FakeService::default())
            .with_description(PluginDescription::Static("Talks to a fake service".into()));
        assert_eq!(plugin.description().await.unwrap(), "Talks to a fake service");
    }

    #[tokio::test]
    async fn template_description_requires_runtime() {
        let plugin = ServicePlugin::new("plugin-test", FakeService::default());
        assert!(matches!(
            plugin.description().await,
            Err(Error::RuntimeUnavailable)
        ));
    }
}
