//! Default configuration template with every option documented.

/// The documented default `maiar.toml`.
pub fn default_config_template() -> String {
    r##"# Maiar Configuration
# ===================
# Every option is listed with its default. Uncomment and modify as needed.
#
# Environment variable substitution is supported: ${ENV_VAR}
# With a fallback: ${ENV_VAR:-value}

# ══════════════════════════════════════════════════════════════════════════════
# RUNTIME
# ══════════════════════════════════════════════════════════════════════════════

[runtime]
abort_on_plugin_failure = true         # false = log a failing plugin and keep starting the rest
startup_notice_delay_ms = 3000         # Delay before a plugin's startup notice is logged
structured_output_attempts = 3         # Attempts to get schema-conforming JSON from a model
# prompts_dir = "./prompts"            # Shared templates, registered as runtime/<name>

# ══════════════════════════════════════════════════════════════════════════════
# CAPABILITIES
# ══════════════════════════════════════════════════════════════════════════════
# Default model per capability. The model must be registered by a provider
# and must support the capability, otherwise startup fails.

[capabilities.defaults]
# text-generation = "gpt-4o"
# image-generation = "dall-e-3"

# ══════════════════════════════════════════════════════════════════════════════
# PLUGINS
# ══════════════════════════════════════════════════════════════════════════════
# One section per plugin id.

# [plugins.plugin-discord]
# enabled = true
# command_prefix = "!"                 # Prefix for command-style triggers
# prompts_dir = "./prompts/discord"    # Overrides the plugin's bundled templates
#
# [plugins.plugin-discord.settings]    # Free-form, handed to trigger factories
# token = "${DISCORD_BOT_TOKEN}"
"##
    .to_string()
}
