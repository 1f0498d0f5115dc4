//! `rrr-app` -- browse and manage shared reuse listings, care homes and
//! food posts from the terminal.
//!
//! Configuration comes from the environment (see
//! [`AppConfig::from_env`](rrr_app::config::AppConfig::from_env)). With no
//! `RRR_SERVICE_URL` the app runs against a seeded in-process service and
//! signs in as a demo user.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rrr_core::types::EntityId;
use rrr_db::models::listing::ListingFields;
use rrr_db::models::{Entity, Facet};
use rrr_sync::{Confirm, DeleteOutcome, Feature};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rrr_app::config::AppConfig;
use rrr_app::demo;
use rrr_app::platform::{Backend, Platform};
use rrr_app::render::{self, Summary};

#[derive(Parser)]
#[command(name = "rrr-app", version, about = "Reduce, reuse, recycle: shared listings from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List entries through search and filters.
    Browse(BrowseArgs),
    /// Everything you have posted, newest first.
    Mine,
    /// Post an item to the marketplace.
    Post(PostArgs),
    /// Rename one of your listings.
    Rename { id: String, name: String },
    /// Delete one of your entries.
    Delete {
        kind: Kind,
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Show your profile.
    Profile,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Listings,
    CareHomes,
    FoodPosts,
}

#[derive(Args)]
struct BrowseArgs {
    kind: Kind,
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    condition: Option<String>,
    /// `all`, `free` or `paid`.
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    food_type: Option<String>,
    /// Leave out food posts whose pickup window has passed.
    #[arg(long)]
    hide_expired: bool,
    /// Only your own entries.
    #[arg(long)]
    mine: bool,
}

#[derive(Args)]
struct PostArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    category: String,
    #[arg(long, default_value = "Good")]
    condition: String,
    /// Asking price; omit for a free item.
    #[arg(long)]
    price: Option<i64>,
    /// Defaults to the address on your profile.
    #[arg(long)]
    location: Option<String>,
    #[arg(long, default_value = "")]
    description: String,
    /// PNG, JPEG or WebP file to attach.
    #[arg(long)]
    image: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rrr_app=info,rrr_sync=info,rrr_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        hosted = config.is_hosted(),
        timeout_secs = config.request_timeout.as_secs(),
        "Loaded configuration"
    );

    let backend = Backend::connect(&config).context("Could not create the service client")?;
    if let Some(service) = backend.in_process() {
        demo::seed(service).await.context("Could not seed demo data")?;
    }

    let mut platform = Platform::new(&backend, config.max_image_bytes);
    let signed_in = match (&config.credentials, backend.in_process()) {
        (Some(credentials), _) => platform.account.sign_in(credentials).await.map(Some),
        (None, Some(_)) => demo::sign_in(&platform.account).await.map(Some),
        (None, None) => Ok(None),
    };
    match &signed_in {
        Ok(Some(actor)) => tracing::info!(actor_id = %actor.id, email = %actor.email, "Signed in"),
        Ok(None) => tracing::info!("Browsing anonymously"),
        Err(e) => tracing::warn!(error = %e, "Continuing without a session"),
    }

    platform.load_all().await;
    let result = run(cli.command, &mut platform).await;

    for notice in platform.take_notices() {
        eprintln!("{}", render::notice(&notice));
    }
    result
}

async fn run(command: Command, platform: &mut Platform) -> anyhow::Result<()> {
    match command {
        Command::Browse(args) => match args.kind {
            Kind::Listings => browse(&mut platform.listings, &args),
            Kind::CareHomes => browse(&mut platform.care_homes, &args),
            Kind::FoodPosts => browse(&mut platform.food_posts, &args),
        },
        Command::Mine => {
            let mine = platform.contributions();
            if mine.is_empty() {
                println!("You have not posted anything yet.");
            }
            for record in mine {
                println!("{}", record.summary());
            }
        }
        Command::Post(args) => post(platform, args).await?,
        Command::Rename { id, name } => {
            let listings = &mut platform.listings;
            let id = EntityId::from(id);
            let target = listings
                .my_items()
                .into_iter()
                .find(|e| e.id() == &id)
                .with_context(|| format!("You have no listing with id {id}"))?;
            listings.begin_edit(&target);
            listings.form_mut().name = name;
            let updated = listings.submit().await?;
            println!("Updated {}", updated.summary());
        }
        Command::Delete { kind, id, yes } => {
            let id = EntityId::from(id);
            let confirm = Prompt { assume_yes: yes };
            let outcome = match kind {
                Kind::Listings => platform.listings.delete(&id, &confirm).await?,
                Kind::CareHomes => platform.care_homes.delete(&id, &confirm).await?,
                Kind::FoodPosts => platform.food_posts.delete(&id, &confirm).await?,
            };
            match outcome {
                DeleteOutcome::Deleted => println!("Deleted {id}"),
                DeleteOutcome::Cancelled => println!("Kept {id}"),
            }
        }
        Command::Profile => match platform.profiles.current_profile() {
            Some(profile) => {
                let f = &profile.fields;
                println!("{} <{}> ({})", f.full_name, f.email, f.role.label());
                if !f.phone.is_empty() {
                    println!("phone: {}", f.phone);
                }
                if !f.address.is_empty() {
                    println!("address: {}", f.address);
                }
            }
            None => println!("Not signed in."),
        },
    }
    Ok(())
}

fn browse<E: Entity + Summary>(feature: &mut Feature<E>, args: &BrowseArgs) {
    feature.set_search(&args.search);
    let facets = [
        (Facet::Category, &args.category),
        (Facet::Condition, &args.condition),
        (Facet::PriceType, &args.price),
        (Facet::FoodType, &args.food_type),
    ];
    for (facet, value) in facets {
        if let Some(value) = value {
            feature.set_filter(facet, value);
        }
    }
    if args.hide_expired {
        feature.hide_expired(Some(chrono::Utc::now()));
    }

    let view = if args.mine {
        feature.visible_mine()
    } else {
        feature.visible()
    };
    for line in render::view(&view) {
        println!("{line}");
    }
}

async fn post(platform: &mut Platform, args: PostArgs) -> anyhow::Result<()> {
    let image = match &args.image {
        Some(path) => Some(platform.listings.read_image(path).await?),
        None => None,
    };
    let profile = platform.profiles.current_profile();

    let listings = &mut platform.listings;
    *listings.form_mut() = ListingFields {
        name: args.name,
        description: args.description,
        category: args.category,
        condition: args.condition,
        is_free: args.price.is_none(),
        price: args.price,
        location: args.location.unwrap_or_default(),
        image,
        ..Default::default()
    };
    if let Some(profile) = &profile {
        listings.autofill(profile);
    }

    let created = listings.submit().await?;
    println!("Posted {}", created.summary());
    Ok(())
}

/// Asks on the terminal unless `--yes` was given.
struct Prompt {
    assume_yes: bool,
}

impl Confirm for Prompt {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{prompt} [y/N] ");
        if io::stderr().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(_) => false,
        }
    }
}
