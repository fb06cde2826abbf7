use anyhow::{Context, Result, bail};
use bulldozer_config::ThemeConfig;
use bulldozer_engine::{
    Assets, Block, BlockInstance, BlockRegistry, BlockRenderer, ClassComposer, Diagnostics,
    HandlebarsEngine, LocalFieldRegistry, RegistrationError, RequestKind, TemplateLocator, from_fn,
    io,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bulldozer")]
#[command(about = "List, inspect and render the blocks of a theme")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Theme directory (holds bulldozer.toml)
    #[arg(short, long, global = true, default_value = ".", env = "BULLDOZER_THEME")]
    theme: PathBuf,

    /// Request context diagnostics are reported for
    #[arg(long, global = true, value_enum, default_value_t = Request::Frontend)]
    request: Request,
}

#[derive(Clone, Copy, ValueEnum)]
enum Request {
    Frontend,
    Admin,
    Login,
}

impl From<Request> for RequestKind {
    fn from(request: Request) -> Self {
        match request {
            Request::Frontend => RequestKind::Frontend,
            Request::Admin => RequestKind::Admin,
            Request::Login => RequestKind::Login,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default bulldozer.toml into the theme directory
    Init {
        /// Theme name shown in diagnostics
        #[arg(long)]
        name: Option<String>,

        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// List the blocks found in the blocks directory
    List,

    /// Render one block instance
    Render {
        /// Block name or slug
        block: String,

        /// Block attributes as a JSON object
        #[arg(short, long, default_value = "{}")]
        attributes: String,

        /// Field values as a JSON object
        #[arg(short, long, default_value = "{}")]
        fields: String,

        /// Inner content
        #[arg(long, default_value = "")]
        content: String,

        /// Render as editor preview
        #[arg(long)]
        preview: bool,

        #[arg(long, default_value_t = 0)]
        post_id: u64,

        /// Print the template context as JSON instead of the HTML
        #[arg(long)]
        context: bool,
    },

    /// Print the field group of a block as JSON
    Fields {
        /// Block name or slug
        block: String,
    },

    /// Resolve a key through the asset manifest
    Asset { key: String },
}

struct Theme {
    config: ThemeConfig,
    registry: BlockRegistry,
    failures: Vec<(PathBuf, RegistrationError)>,
}

impl Theme {
    fn load(config: ThemeConfig, diagnostics: &mut Diagnostics) -> Result<Self> {
        let descriptors = io::discover_blocks(&config.blocks_path())?;
        log::info!("Found {} block descriptors", descriptors.len());

        let mut registry = BlockRegistry::new();
        let mut backend = LocalFieldRegistry::new();
        let failures = registry.register_all(
            descriptors.into_iter().map(|descriptor| {
                let block: Box<dyn Block> = Box::new(from_fn(|_, context| context));
                (descriptor, block)
            }),
            &mut backend,
            diagnostics,
        );

        Ok(Self {
            config,
            registry,
            failures,
        })
    }

    fn renderer(&self) -> Result<BlockRenderer> {
        let composer = ClassComposer::new(&self.config.reserved_class_pattern)
            .context("Invalid reserved_class_pattern")?;
        Ok(BlockRenderer::new(
            TemplateLocator::new(
                self.config.template_override_path(),
                self.config.blocks_path(),
            ),
            Box::new(HandlebarsEngine::new()),
        )
        .with_composer(composer)
        .with_global_context(self.config.global_context()))
    }

    fn block_name(&self, block: &str) -> Result<String> {
        let found = self
            .registry
            .find(block)
            .or_else(|| self.registry.get(&self.config.block_name(block)));
        match found {
            Some(registered) => Ok(registered.definition.name.clone()),
            None => bail!("Unknown block: {block}"),
        }
    }
}

fn parse_object(json: &str, what: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(json).with_context(|| format!("Invalid {what} JSON"))? {
        Value::Object(map) => Ok(map),
        other => bail!("{what} must be a JSON object, got {other}"),
    }
}

fn report(diagnostics: &Diagnostics) {
    for error in diagnostics.frontend_errors() {
        eprintln!("{}: {} ({})", error.title, error.message, error.subtitle);
    }
    for notice in diagnostics.backend_notices() {
        eprintln!("[{}] {} {}", notice.severity, notice.message, notice.title);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { name, force } = &cli.command {
        let config_path = ThemeConfig::config_path(&cli.theme);
        if config_path.exists() && !force {
            bail!("{} already exists, use --force to overwrite", config_path.display());
        }
        let mut config = ThemeConfig::for_theme(&cli.theme);
        if let Some(name) = name {
            config.theme_name = name.clone();
        }
        config.save_to_path(&config_path)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let config = ThemeConfig::load_or_default(&cli.theme)?;
    let mut diagnostics = Diagnostics::new(config.theme_name.clone(), cli.request.into());

    // Diagnostics collected before a failure are still reported
    let result = execute(cli.command, config, &mut diagnostics);
    report(&diagnostics);
    result
}

fn execute(command: Commands, config: ThemeConfig, diagnostics: &mut Diagnostics) -> Result<()> {
    match command {
        Commands::Init { .. } => Ok(()),
        Commands::List => {
            let theme = Theme::load(config, diagnostics)?;
            for block in theme.registry.blocks() {
                let location = block
                    .definition
                    .directory
                    .as_deref()
                    .and_then(|dir| {
                        io::relative_paths(&theme.config.theme_dir, &[dir.to_path_buf()])
                            .into_iter()
                            .next()
                    })
                    .map(|path| path.to_string())
                    .unwrap_or_default();
                println!(
                    "{}\t{}\t{}\t{}",
                    block.definition.name, block.definition.title, block.definition.version, location
                );
            }
            for (descriptor, err) in &theme.failures {
                eprintln!("skipped {}: {err}", descriptor.display());
            }
            Ok(())
        }
        Commands::Render {
            block,
            attributes,
            fields,
            content,
            preview,
            post_id,
            context,
        } => {
            let theme = Theme::load(config, diagnostics)?;
            let name = theme.block_name(&block)?;
            let instance = BlockInstance::new(parse_object(&attributes, "attributes")?)
                .with_fields(parse_object(&fields, "fields")?)
                .with_content(content)
                .preview(preview)
                .with_post_id(post_id);
            let renderer = theme.renderer()?;

            if context {
                let registered = theme.registry.find(&name).context("Unknown block")?;
                let composed = renderer.compose(registered, &instance);
                println!("{}", serde_json::to_string_pretty(&composed)?);
            } else {
                let rendered = renderer.render_named(&theme.registry, &name, &instance, diagnostics)?;
                println!("{}", rendered.html);
            }
            Ok(())
        }
        Commands::Fields { block } => {
            let theme = Theme::load(config, diagnostics)?;
            let name = theme.block_name(&block)?;
            let registered = theme.registry.find(&name).context("Unknown block")?;
            println!("{}", serde_json::to_string_pretty(&registered.fields)?);
            Ok(())
        }
        Commands::Asset { key } => {
            let assets = Assets::new(config.dist_path(), config.dist_uri(), config.manifest_path());
            let asset = assets.get(&key, diagnostics);
            println!("uri\t{}", asset.uri().unwrap_or_default());
            println!(
                "path\t{}",
                asset.path().map(|p| p.display().to_string()).unwrap_or_default()
            );
            println!("exists\t{}", asset.exists());
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    run(Cli::parse())
}
