//! Outbound CLI
//!
//! Runs the lead discovery pipelines: scrape, match, extract, store, forward.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use url::Url;

use outbound_agents::{
    create_anthropic_backend, create_backend, create_gemini_backend, AnthropicConfig, ClayClient, ClayConfig,
    GeminiConfig, LlmExtractor, MemorySink, MemoryStore, OpenAIBackendConfig, Settings, SharedBackend, SharedStore,
    SupabaseStore, DEFAULT_GEMINI_MODEL,
};
use outbound_core::{RateLimiter, Vertical};
use outbound_runtime::{
    BigTechConfig, BigTechPipeline, Delivery, FundConfig, FundPipeline, PeopleConfig, PeopleFinder, Pipeline,
    RunReport, UtAlumniConfig, UtAlumniPipeline, VcConfig, VcPipeline,
};
use outbound_web::{
    FirecrawlClient, FirecrawlConfig, HttpConfig, HttpFetcher, PageRouter, SharedFetcher, SharedScraper,
};

#[derive(Parser)]
#[command(name = "outbound")]
#[command(author, version, about = "Outbound: lead discovery from public web pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,

    /// Keep rows and webhook batches in memory instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,
}

/// LLM provider selection (Gemini is default)
#[derive(Args, Clone)]
struct LlmArgs {
    /// LLM model to use (defaults per provider)
    #[arg(long)]
    model: Option<String>,

    /// Google API key (or set GOOGLE_API_KEY env var)
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    google_key: Option<String>,

    /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_key: Option<String>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Use Anthropic instead of Gemini
    #[arg(long)]
    anthropic: bool,

    /// Use OpenAI instead of Gemini
    #[arg(long, conflicts_with = "anthropic")]
    openai: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan big-tech company pages for program signals
    Bigtech {
        /// Extra seed URL (repeatable, added to the defaults)
        #[arg(long = "url")]
        urls: Vec<String>,

        #[arg(long, default_value = "bigtech_pages")]
        pages_table: String,

        #[arg(long, default_value = "bigtech_signals")]
        signals_table: String,

        /// Store only, do not forward to Clay
        #[arg(long)]
        skip_clay: bool,
    },

    /// Scan UT giving pages for donor signals
    UtAlumni {
        /// Extra seed URL (repeatable, added to the defaults)
        #[arg(long = "url")]
        urls: Vec<String>,

        #[arg(long, default_value = "ut_pages")]
        pages_table: String,

        #[arg(long, default_value = "ut_donor_signals")]
        signals_table: String,

        #[arg(long, default_value = "contacts")]
        contacts_table: String,

        /// Also extract alumni contacts with the LLM
        #[arg(long)]
        extract_alumni: bool,

        #[command(flatten)]
        llm: LlmArgs,

        /// Store only, do not forward to Clay
        #[arg(long)]
        skip_clay: bool,
    },

    /// Find Series A+ portfolio companies and their partnership programs
    Vc {
        /// Portfolio listing URL (repeatable, replaces the defaults)
        #[arg(long = "portfolio-url")]
        portfolio_urls: Vec<String>,

        #[arg(long, default_value = "vc_portfolios")]
        portfolios_table: String,

        #[arg(long, default_value = "portfolio_companies")]
        companies_table: String,

        #[arg(long, default_value = "partnership_signals")]
        signals_table: String,

        #[arg(long, default_value = "contacts")]
        contacts_table: String,

        /// Listing pages followed per portfolio
        #[arg(long, default_value = "8")]
        max_pages: usize,

        /// Store portfolio pages only, without LLM extraction
        #[arg(long)]
        no_llm: bool,

        #[command(flatten)]
        llm: LlmArgs,

        /// Store only, do not forward to Clay
        #[arg(long)]
        skip_clay: bool,
    },

    /// Extract partners and portfolio companies from fund websites
    Funds {
        /// Fund domains, e.g. a16z.com
        #[arg(required = true)]
        domains: Vec<String>,

        /// Pages scraped per section
        #[arg(long, default_value = "8", value_parser = clap::value_parser!(u16).range(1..=20))]
        max_pages: u16,

        #[arg(long, default_value = "vc_people")]
        people_table: String,

        #[arg(long, default_value = "vc_portfolio_companies")]
        companies_table: String,

        /// Write the extracted people and companies as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Crawl one site's team pages for named people
    People {
        /// Site to crawl
        url: String,

        /// Maximum pages to crawl
        #[arg(long, default_value = "20")]
        max_pages: u32,

        /// Kind of people to look for, e.g. "founders, engineering leads"
        #[arg(long)]
        signals: Option<String>,

        /// Clay webhook to post the people to
        #[arg(long)]
        clay_webhook: Option<String>,

        /// Write the people as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Show the team and portfolio pages found for a domain
    Route {
        domain: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loads .env first so clap sees its keys too
    let settings = Settings::from_env()?;
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let ctx = Context::new(settings, cli.dry_run);

    match cli.command {
        Commands::Bigtech {
            urls,
            pages_table,
            signals_table,
            skip_clay,
        } => {
            let mut config = BigTechConfig {
                pages_table,
                signals_table,
                ..Default::default()
            };
            config.seeds.extend(urls);

            let pipeline = BigTechPipeline::new(
                ctx.fetcher()?,
                ctx.store()?,
                ctx.delivery(Vertical::BigTech, skip_clay)?,
                config,
            );
            ctx.finish(pipeline.run().await?);
        }
        Commands::UtAlumni {
            urls,
            pages_table,
            signals_table,
            contacts_table,
            extract_alumni,
            llm,
            skip_clay,
        } => {
            let mut config = UtAlumniConfig {
                pages_table,
                signals_table,
                contacts_table,
                ..Default::default()
            };
            config.seeds.extend(urls);

            let mut pipeline = UtAlumniPipeline::new(
                ctx.fetcher()?,
                ctx.store()?,
                ctx.delivery(Vertical::UtAlumni, skip_clay)?,
                config,
            );
            if extract_alumni {
                pipeline = pipeline.with_extractor(ctx.extractor(&llm)?);
            }
            ctx.finish(pipeline.run().await?);
        }
        Commands::Vc {
            portfolio_urls,
            portfolios_table,
            companies_table,
            signals_table,
            contacts_table,
            max_pages,
            no_llm,
            llm,
            skip_clay,
        } => {
            let mut config = VcConfig {
                portfolios_table,
                companies_table,
                signals_table,
                contacts_table,
                max_pages,
                ..Default::default()
            };
            if !portfolio_urls.is_empty() {
                config.portfolio_urls = portfolio_urls;
            }

            let mut pipeline = VcPipeline::new(
                ctx.fetcher()?,
                ctx.store()?,
                ctx.delivery(Vertical::VcPartnerships, skip_clay)?,
                config,
            );
            if !no_llm {
                pipeline = pipeline.with_extractor(ctx.extractor(&llm)?);
            }
            ctx.finish(pipeline.run().await?);
        }
        Commands::Funds {
            domains,
            max_pages,
            people_table,
            companies_table,
            output,
            llm,
        } => {
            let config = FundConfig {
                domains,
                max_pages: usize::from(max_pages),
                people_table,
                companies_table,
            };

            let pipeline = FundPipeline::new(
                ctx.fetcher()?,
                ctx.scraper()?,
                ctx.extractor(&llm)?,
                ctx.store()?,
                config,
            );
            let mut report = RunReport::new("funds");
            let results = pipeline.collect(&mut report).await;

            if let Some(path) = output {
                fs::write(&path, serde_json::to_string_pretty(&results)?)?;
                println!("📄 Results saved to: {}", path.display());
            }
            pipeline.store_results(&results, &mut report).await?;
            ctx.finish(report);
        }
        Commands::People {
            url,
            max_pages,
            signals,
            clay_webhook,
            output,
            llm,
        } => {
            let crawler = FirecrawlClient::new(FirecrawlConfig::new(ctx.settings.firecrawl_api_key()?))?;

            let delivery = match clay_webhook {
                _ if ctx.dry_run => Delivery::Webhook(ctx.sink.clone()),
                Some(webhook) => {
                    let mut clay = ClayConfig::new(&webhook).bare();
                    clay.api_key = ctx.settings.clay_api_key.clone();
                    clay.timeout_secs = ctx.settings.requests_timeout_seconds;
                    Delivery::Webhook(Arc::new(ClayClient::new(clay)?))
                }
                None => Delivery::Disabled,
            };

            let mut config = PeopleConfig::new(&url);
            config.max_pages = max_pages;
            config.signals = signals;

            let finder = PeopleFinder::new(Arc::new(crawler), ctx.extractor(&llm)?, delivery, config);
            let mut report = RunReport::new("people");
            let people = finder.find(&mut report).await?;

            println!("\n👥 {} people found", people.len());
            for person in &people {
                println!("   {} | {} | {}", person.name, person.role, person.company);
            }

            if let Some(path) = output {
                fs::write(&path, serde_json::to_string_pretty(&people)?)?;
                println!("📄 People saved to: {}", path.display());
            }
            finder.deliver(&people, &mut report).await?;
            ctx.finish(report);
        }
        Commands::Route { domain } => {
            let route = PageRouter::new(ctx.fetcher()?).route(&domain).await;

            let show = |url: Option<&Url>| url.map_or_else(|| "not found".to_string(), |u| u.to_string());
            println!("🧭 {}", domain);
            println!("   Team:      {}", show(route.team_url.as_ref()));
            println!("   Portfolio: {}", show(route.portfolio_url.as_ref()));
        }
    }

    Ok(())
}

/// Clients shared by every subcommand
struct Context {
    settings: Settings,
    dry_run: bool,
    memory: Arc<MemoryStore>,
    sink: Arc<MemorySink>,
}

impl Context {
    fn new(settings: Settings, dry_run: bool) -> Self {
        Self {
            settings,
            dry_run,
            memory: MemoryStore::shared(),
            sink: Arc::new(MemorySink::new()),
        }
    }

    fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout_secs: self.settings.requests_timeout_seconds,
            ..Default::default()
        }
    }

    fn fetcher(&self) -> Result<SharedFetcher> {
        Ok(HttpFetcher::shared(&self.http_config())?)
    }

    /// Firecrawl when a key is configured, plain HTTP otherwise
    fn scraper(&self) -> Result<SharedScraper> {
        match self.settings.firecrawl_api_key() {
            Ok(key) => Ok(Arc::new(FirecrawlClient::new(FirecrawlConfig::new(key))?)),
            Err(_) => Ok(Arc::new(HttpFetcher::new(&self.http_config())?)),
        }
    }

    fn store(&self) -> Result<SharedStore> {
        if self.dry_run {
            return Ok(self.memory.clone());
        }

        Ok(Arc::new(SupabaseStore::new(self.settings.supabase()?)?))
    }

    /// Missing webhooks only fail a run that has records to send
    fn delivery(&self, vertical: Vertical, skip_clay: bool) -> Result<Delivery> {
        if skip_clay {
            return Ok(Delivery::Disabled);
        }
        if self.dry_run {
            return Ok(Delivery::Webhook(self.sink.clone()));
        }

        match self.settings.clay_for(vertical) {
            Ok(config) => Ok(Delivery::Webhook(Arc::new(ClayClient::new(config)?))),
            Err(e) => Ok(Delivery::Unconfigured(e.to_string())),
        }
    }

    fn backend(&self, llm: &LlmArgs) -> Result<SharedBackend> {
        let backend = if llm.anthropic {
            let key = llm.anthropic_key.as_deref().ok_or_else(|| {
                anyhow!("Anthropic API key required. Set ANTHROPIC_API_KEY or use --anthropic-key")
            })?;
            let model = llm.model.as_deref().unwrap_or("claude-sonnet-4-20250514");
            create_anthropic_backend(AnthropicConfig::new(key, model))?
        } else if llm.openai {
            let key = llm
                .api_key
                .as_deref()
                .ok_or_else(|| anyhow!("OpenAI API key required. Set OPENAI_API_KEY or use --api-key"))?;
            let model = llm.model.as_deref().unwrap_or("gpt-4o-mini");
            create_backend(OpenAIBackendConfig::openai(key, model))?
        } else {
            let key = match llm.google_key.as_deref() {
                Some(key) => key,
                None => self.settings.google_api_key()?,
            };
            let model = llm.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
            create_gemini_backend(GeminiConfig::new(key).with_model(model))?
        };

        Ok(backend)
    }

    fn extractor(&self, llm: &LlmArgs) -> Result<Arc<LlmExtractor>> {
        let limiter = Arc::new(RateLimiter::new(self.settings.llm_rpm));
        let rpm = limiter.rpm();
        let extractor = LlmExtractor::new(self.backend(llm)?, limiter);
        println!("📡 Model: {} | {} requests/min", extractor.model_name(), rpm);

        Ok(Arc::new(extractor))
    }

    fn finish(&self, report: RunReport) {
        println!("\n✅ {} complete", report.pipeline);
        println!("   Pages:    {}", report.pages);
        println!("   Signals:  {}", report.signals);
        println!("   Records:  {}", report.records);
        println!("   Ingested: {}", report.ingested);

        if !report.skipped.is_empty() {
            println!("\n⚠️  Skipped {}:", report.skipped.len());
            for reason in &report.skipped {
                println!("   {}", reason);
            }
        }

        if self.dry_run {
            println!("\n🧪 Dry run, nothing was sent");
            for table in self.memory.tables() {
                println!("   {}: {} row(s)", table, self.memory.rows(&table).len());
            }
            println!("   webhook: {} record(s)", self.sink.records().len());
        }
    }
}
