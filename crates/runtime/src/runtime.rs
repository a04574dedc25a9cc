use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, Ordering},
};

use {
    async_trait::async_trait,
    maiar_capabilities::ModelManager,
    maiar_config::MaiarConfig,
    maiar_plugins::{
        ExecutionOutcome, Executor, InitContext, Plugin, PluginRuntime, PluginState,
        RuntimeHandle, Trigger, TriggerEvent, TriggerSettings,
    },
    maiar_schema::{SchemaDescription, extract_json, structured_output_prompt, validate},
    schemars::JsonSchema,
    serde::de::DeserializeOwned,
    serde_json::Value,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Context, Error, Result},
    templates::TemplateRegistry,
};

/// Namespace for templates shared by every plugin.
pub const RUNTIME_TEMPLATE_NAMESPACE: &str = "runtime";

/// Parts of a plugin that routing reads without locking the plugin itself.
#[derive(Clone)]
struct PluginView {
    state: PluginState,
    triggers: Vec<Arc<dyn Trigger>>,
    executors: Vec<Arc<dyn Executor>>,
}

impl PluginView {
    fn of(plugin: &dyn Plugin) -> Self {
        Self {
            state: plugin.state(),
            triggers: plugin.triggers().to_vec(),
            executors: plugin.executors().to_vec(),
        }
    }
}

/// A registered plugin. `init` and `shutdown` run under the slot's own lock,
/// so the runtime stays reachable from plugin code while they are awaited.
struct PluginSlot {
    id: String,
    plugin: tokio::sync::Mutex<Box<dyn Plugin>>,
    view: RwLock<PluginView>,
}

impl PluginSlot {
    fn new(plugin: Box<dyn Plugin>) -> Self {
        Self {
            id: plugin.id().to_string(),
            view: RwLock::new(PluginView::of(&*plugin)),
            plugin: tokio::sync::Mutex::new(plugin),
        }
    }

    fn view(&self) -> PluginView {
        self.view.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn state(&self) -> PluginState {
        self.view.read().unwrap_or_else(|e| e.into_inner()).state
    }

    fn refresh(&self, plugin: &dyn Plugin) {
        *self.view.write().unwrap_or_else(|e| e.into_inner()) = PluginView::of(plugin);
    }

    async fn init(&self, context: InitContext) -> maiar_plugins::Result<()> {
        let mut plugin = self.plugin.lock().await;
        let result = plugin.init(context).await;
        self.refresh(&**plugin);
        result
    }

    async fn shutdown(&self) -> maiar_plugins::Result<()> {
        let mut plugin = self.plugin.lock().await;
        let result = plugin.shutdown().await;
        self.refresh(&**plugin);
        result
    }
}

/// Owns the plugins and the model manager and routes work between them.
///
/// Plugins are registered before [`Runtime::start`], initialized in
/// registration order and shut down in reverse order.
pub struct Runtime {
    config: MaiarConfig,
    models: Arc<ModelManager>,
    templates: RwLock<TemplateRegistry>,
    plugins: tokio::sync::RwLock<Vec<Arc<PluginSlot>>>,
    handle: RuntimeHandle,
    started: AtomicBool,
}

impl Runtime {
    pub fn new(config: MaiarConfig, models: Arc<ModelManager>) -> Result<Arc<Self>> {
        let mut templates = TemplateRegistry::new();
        if let Some(dir) = &config.runtime.prompts_dir {
            let loaded = templates.load_dir(RUNTIME_TEMPLATE_NAMESPACE, dir)?;
            debug!(dir = %dir.display(), loaded, "loaded runtime templates");
        }

        Ok(Arc::new(Self {
            config,
            models,
            templates: RwLock::new(templates),
            plugins: tokio::sync::RwLock::new(Vec::new()),
            handle: RuntimeHandle::new(),
            started: AtomicBool::new(false),
        }))
    }

    pub fn config(&self) -> &MaiarConfig {
        &self.config
    }

    pub fn models(&self) -> &Arc<ModelManager> {
        &self.models
    }

    /// Accessor handed to plugins. Bound once [`Runtime::start`] runs.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Register a plugin and load its prompt templates. Plugins disabled in
    /// the config are skipped.
    pub async fn register_plugin(&self, plugin: Box<dyn Plugin>) -> Result<()> {
        let id = plugin.id().to_string();
        let plugin_config = self.config.plugin(&id);
        if !plugin_config.enabled {
            info!(plugin = %id, "plugin disabled in config, skipping");
            return Ok(());
        }

        let mut plugins = self.plugins.write().await;
        if self.is_started() {
            return Err(Error::AlreadyStarted);
        }
        if plugins.iter().any(|slot| slot.id == id) {
            return Err(Error::DuplicatePlugin { plugin: id });
        }

        let prompts_dir = plugin_config
            .prompts_dir
            .as_deref()
            .or_else(|| plugin.prompts_dir());
        if let Some(dir) = prompts_dir {
            let loaded = self.write_templates().load_dir(&id, dir)?;
            debug!(plugin = %id, dir = %dir.display(), loaded, "loaded plugin templates");
        }

        info!(plugin = %id, "registered plugin");
        plugins.push(Arc::new(PluginSlot::new(plugin)));
        Ok(())
    }

    /// Register a template directly, e.g. for plugins that bundle templates
    /// in code.
    pub fn add_template(&self, namespace: &str, name: &str, content: &str) -> Result<()> {
        self.write_templates().add_raw(namespace, name, content)
    }

    pub fn render(&self, key: &str, context: &Value) -> Result<String> {
        self.read_templates().render(key, context)
    }

    fn read_templates(&self) -> std::sync::RwLockReadGuard<'_, TemplateRegistry> {
        self.templates.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_templates(&self) -> std::sync::RwLockWriteGuard<'_, TemplateRegistry> {
        self.templates.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the registered plugins. The list lock is released before
    /// any plugin code runs.
    async fn slots(&self) -> Vec<Arc<PluginSlot>> {
        self.plugins.read().await.clone()
    }

    /// Bring every registered plugin up.
    ///
    /// Applies configured capability defaults, checks required capabilities,
    /// binds the runtime accessor, initializes plugins in registration order
    /// and finally starts their triggers.
    ///
    /// A failed default or capability check leaves the runtime unstarted. A
    /// failure after plugins were initialized is terminal: the runtime stays
    /// started and the plugins that came up are shut down again.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if self.is_started() {
            return Err(Error::AlreadyStarted);
        }

        for (capability, model) in &self.config.capabilities.defaults {
            self.models.set_default_model(capability, model)?;
            debug!(capability = %capability, model = %model, "applied default model");
        }

        let plugins = self.plugins.write().await;
        for slot in plugins.iter() {
            let plugin = slot.plugin.lock().await;
            for capability in plugin.required_capabilities() {
                if !self.models.has_capability(capability) {
                    return Err(Error::MissingCapability {
                        plugin: slot.id.clone(),
                        capability: capability.clone(),
                    });
                }
            }
        }

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }
        let slots = plugins.clone();
        drop(plugins);

        let weak: std::sync::Weak<Self> = Arc::downgrade(self);
        self.handle.bind(weak);

        let abort = self.config.runtime.abort_on_plugin_failure;
        for (index, slot) in slots.iter().enumerate() {
            match slot.init(self.init_context(&slot.id)).await {
                Ok(()) => {},
                Err(e) if abort => {
                    warn!(plugin = %slot.id, error = %e, "plugin failed to initialize, aborting startup");
                    shutdown_all(&slots[..index]).await;
                    return Err(e.into());
                },
                Err(e) => {
                    warn!(plugin = %slot.id, error = %e, "plugin failed to initialize, skipping");
                },
            }
        }

        let running: Vec<(String, PluginView)> = slots
            .iter()
            .map(|slot| (slot.id.clone(), slot.view()))
            .filter(|(_, view)| view.state == PluginState::Running)
            .collect();

        for (plugin, view) in &running {
            for trigger in &view.triggers {
                let started = trigger.start().await.with_context(|| {
                    format!("plugin {plugin}: trigger {} failed to start", trigger.id())
                });
                match started {
                    Ok(()) => debug!(plugin = %plugin, trigger = trigger.id(), "trigger started"),
                    Err(e) if abort => {
                        warn!(error = %e, "trigger failed to start, aborting startup");
                        shutdown_all(&slots).await;
                        return Err(e);
                    },
                    Err(e) => warn!(error = %e, "trigger failed to start, continuing"),
                }
            }
        }

        info!(plugins = running.len(), "runtime started");
        Ok(())
    }

    fn init_context(&self, plugin_id: &str) -> InitContext {
        let plugin_config = self.config.plugin(plugin_id);
        InitContext {
            runtime: self.handle.clone(),
            trigger_settings: TriggerSettings {
                command_prefix: plugin_config.command_prefix().to_string(),
                settings: plugin_config.settings,
            },
            notice_delay: self.config.runtime.startup_notice_delay(),
        }
    }

    /// Invoke every running executor named by `event`, in plugin order then
    /// registration order. Executor failures are reported in the outcomes.
    pub async fn dispatch(&self, event: TriggerEvent) -> Result<Vec<ExecutionOutcome>> {
        let name = event.executor.as_str();
        let targets: Vec<(String, Arc<dyn Executor>)> = self
            .slots()
            .await
            .iter()
            .map(|slot| (slot.id.clone(), slot.view()))
            .filter(|(_, view)| view.state == PluginState::Running)
            .flat_map(|(id, view)| {
                view.executors
                    .into_iter()
                    .filter(move |e| e.name() == name)
                    .map(move |e| (id.clone(), e))
            })
            .collect();
        if targets.is_empty() {
            return Err(Error::NoExecutor {
                executor: event.executor,
            });
        }

        debug!(
            source = %event.source,
            plugin = %event.plugin_id,
            executor = %event.executor,
            targets = targets.len(),
            "dispatching event"
        );
        let mut outcomes = Vec::with_capacity(targets.len());
        for (plugin_id, executor) in targets {
            let outcome = match executor.execute(event.input.clone()).await {
                Ok(output) => ExecutionOutcome {
                    plugin_id,
                    executor: executor.name().to_string(),
                    output: Some(output),
                    error: None,
                },
                Err(e) => {
                    warn!(plugin = %plugin_id, executor = executor.name(), error = %e, "executor failed");
                    ExecutionOutcome {
                        plugin_id,
                        executor: executor.name().to_string(),
                        output: None,
                        error: Some(e.to_string()),
                    }
                },
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// First trigger of `plugin_id`, in registration order, that claims
    /// `text`.
    pub async fn route(&self, plugin_id: &str, text: &str) -> Result<Option<Arc<dyn Trigger>>> {
        let slot = self
            .slots()
            .await
            .into_iter()
            .find(|slot| slot.id == plugin_id)
            .ok_or_else(|| Error::UnknownPlugin {
                plugin: plugin_id.to_string(),
            })?;
        Ok(slot
            .view()
            .triggers
            .into_iter()
            .find(|trigger| trigger.matches(text)))
    }

    pub async fn execute_capability(
        &self,
        capability: &str,
        input: Value,
        model: Option<&str>,
    ) -> Result<Value> {
        Ok(self
            .models
            .execute_capability(capability, input, model)
            .await?)
    }

    /// Ask the model serving `capability` for JSON matching `schema`.
    ///
    /// The reply may be a JSON value or text containing JSON. Invalid replies
    /// are retried with the validation error appended to the prompt, up to
    /// `runtime.structured_output_attempts` times.
    pub async fn get_object(
        &self,
        capability: &str,
        instruction: &str,
        schema: &SchemaDescription,
    ) -> Result<Value> {
        let attempts = self.config.runtime.structured_output_attempts;
        let base_prompt = structured_output_prompt(instruction, schema);
        let mut prompt = base_prompt.clone();
        let mut last_error = String::from("no attempts were made");

        for attempt in 1..=attempts {
            let reply = self
                .execute_capability(capability, Value::String(prompt.clone()), None)
                .await?;
            let candidate = match reply {
                Value::String(text) => extract_json(&text),
                value => Ok(value),
            };
            match candidate.and_then(|value| validate(&value, schema).map(|()| value)) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(capability, attempt, error = %e, "structured output rejected");
                    last_error = e.to_string();
                    prompt = format!(
                        "{base_prompt}\nYour previous reply was rejected ({last_error}). \
                         Reply again with corrected JSON only.\n"
                    );
                },
            }
        }

        Err(Error::StructuredOutput {
            capability: capability.to_string(),
            attempts,
            last_error,
        })
    }

    /// Typed [`Runtime::get_object`]; the schema is derived from `T`.
    pub async fn get_object_as<T>(&self, capability: &str, instruction: &str) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = SchemaDescription::for_type::<T>()?;
        let value = self.get_object(capability, instruction, &schema).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn plugin_ids(&self) -> Vec<String> {
        self.plugins
            .read()
            .await
            .iter()
            .map(|slot| slot.id.clone())
            .collect()
    }

    pub async fn plugin_state(&self, plugin_id: &str) -> Option<PluginState> {
        self.plugins
            .read()
            .await
            .iter()
            .find(|slot| slot.id == plugin_id)
            .map(|slot| slot.state())
    }

    /// Each plugin's description, in registration order.
    pub async fn plugin_descriptions(&self) -> Vec<(String, Result<String>)> {
        let slots = self.slots().await;
        let mut descriptions = Vec::with_capacity(slots.len());
        for slot in &slots {
            let description = slot.plugin.lock().await.description().await;
            descriptions.push((slot.id.clone(), description.map_err(Error::from)));
        }
        descriptions
    }

    /// Shut plugins down in reverse registration order. Every running plugin
    /// is attempted; the first failure is returned.
    pub async fn shutdown(&self) -> Result<()> {
        let slots = self.slots().await;
        let first_error = shutdown_all(&slots).await;
        info!("runtime shut down");
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

async fn shutdown_all(slots: &[Arc<PluginSlot>]) -> Option<maiar_plugins::Error> {
    let mut first_error = None;
    for slot in slots.iter().rev() {
        if slot.state() != PluginState::Running {
            continue;
        }
        if let Err(e) = slot.shutdown().await {
            warn!(plugin = %slot.id, error = %e, "plugin failed to shut down");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }
    first_error
}

#[async_trait]
impl PluginRuntime for Runtime {
    fn models(&self) -> &ModelManager {
        &self.models
    }

    fn render_template(&self, key: &str, context: &Value) -> anyhow::Result<String> {
        Ok(self.render(key, context)?)
    }

    async fn dispatch(&self, event: TriggerEvent) -> anyhow::Result<Vec<ExecutionOutcome>> {
        Ok(Runtime::dispatch(self, event).await?)
    }

    async fn structured(
        &self,
        capability: &str,
        instruction: &str,
        schema: &SchemaDescription,
    ) -> anyhow::Result<Value> {
        Ok(self.get_object(capability, instruction, schema).await?)
    }
}
