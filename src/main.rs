mod backend;
mod config;
mod demo;
mod error;
mod favorites;
mod models;
mod profile;
mod query;
mod session;

use anyhow::{Context, Result};
use backend::{Backend, PostgrestBackend};
use clap::{Parser, Subcommand};
use config::Config;
use models::{Listing, UserProfile};
use query::SearchFilters;
use serde::Serialize;
use session::{Provider, SessionContext};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "estate-browser")]
#[command(about = "Browse, search and favorite real-estate listings")]
struct Args {
    /// Use the built-in offline catalogue instead of the configured backend
    #[arg(long, global = true)]
    demo: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Newest listings
    Recent {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Listings of one category (House, Apartment, Villa, Cabin, Loft) or All
    Explore {
        #[arg(default_value = "All")]
        category: String,
    },
    /// Search by free text and filters
    Search {
        /// Matched against title, description and location
        term: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        /// Exact bedroom count
        #[arg(long)]
        bedrooms: Option<i32>,
        /// Exact bathroom count
        #[arg(long)]
        bathrooms: Option<i32>,
        #[arg(long)]
        category: Option<String>,
    },
    /// One listing in detail
    Show { id: String },
    /// Toggle a listing in your favorites
    Favorite { id: String },
    /// Your favorited listings
    Favorites,
    /// Your profile
    Profile,
    /// Change your display name
    Rename { name: String },
    /// Print the sign-in URL for an identity provider
    Login {
        provider: Provider,
        #[arg(long)]
        redirect_to: Option<String>,
    },
    /// Revoke the configured access token
    Logout,
}

/// Backend plus the session established against it
struct Connection {
    backend: Box<dyn Backend>,
    session: SessionContext,
    remote: Option<PostgrestBackend>,
    recent_limit: usize,
}

async fn connect(demo_mode: bool) -> Result<Connection> {
    if demo_mode {
        info!("Running against the offline demo catalogue");
        return Ok(Connection {
            backend: Box::new(demo::seeded_backend().await),
            session: SessionContext::signed_in(demo::demo_identity(), None),
            remote: None,
            recent_limit: query::DEFAULT_RECENT_LIMIT,
        });
    }

    let config = Config::load().context("Failed to load configuration")?;
    let auth = PostgrestBackend::new(&config)?;

    let mut session = SessionContext::anonymous();
    if let Some(token) = &config.access_token {
        let identity = auth
            .current_user(token)
            .await
            .context("Failed to establish session from BACKEND_ACCESS_TOKEN")?;
        info!("Signed in as {}", identity.email);
        session.sign_in(identity, Some(token.clone()));
    }

    let backend = PostgrestBackend::new(&config)?
        .with_access_token(session.access_token().map(str::to_string));
    info!("Using {} backend at {}", backend.backend_name(), config.backend_url);

    Ok(Connection {
        backend: Box::new(backend),
        session,
        remote: Some(auth),
        recent_limit: config.recent_limit,
    })
}

fn print_listings(listings: &[Listing], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(listings)?);
        return Ok(());
    }

    info!("{} listings", listings.len());
    for (i, listing) in listings.iter().enumerate() {
        println!("{}. {} (${:.0})", i + 1, listing.title, listing.price);
        println!(
            "   {} · {} bd, {} ba, {} sq ft",
            listing.category, listing.bedrooms, listing.bathrooms, listing.area
        );
        println!("   {}", listing.location);
        println!("   ID: {}", listing.id);
        println!();
    }
    Ok(())
}

fn print_detail(listing: &Listing, favorite: bool, json: bool) -> Result<()> {
    if json {
        #[derive(Serialize)]
        struct Detail<'a> {
            #[serde(flatten)]
            listing: &'a Listing,
            favorite: bool,
        }
        println!("{}", serde_json::to_string_pretty(&Detail { listing, favorite })?);
        return Ok(());
    }

    let heart = if favorite { "♥" } else { "♡" };
    println!("{} {} (${:.0})", heart, listing.title, listing.price);
    println!("   {}", listing.location);
    println!(
        "   {} Beds · {} Baths · {} sq ft · {}",
        listing.bedrooms, listing.bathrooms, listing.area, listing.category
    );
    println!("   Image: {}", listing.image_url);
    println!("   Listed: {}", listing.created_at.format("%Y-%m-%d"));
    println!();
    println!("{}", listing.description);
    Ok(())
}

fn print_profile(profile: &UserProfile, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    println!("{}", profile.display_name());
    println!("   {}", profile.email);
    if let Some(avatar) = profile.avatar_url.as_deref().filter(|a| !a.is_empty()) {
        println!("   Avatar: {}", avatar);
    }
    println!("   Member since {}", profile.created_at.format("%Y-%m-%d"));
    Ok(())
}

fn require_sign_in(session: &SessionContext) -> Result<()> {
    if !session.is_authenticated() {
        anyhow::bail!("Sign in required: set BACKEND_ACCESS_TOKEN or use --demo");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Command::Login {
        provider,
        redirect_to,
    } = &args.command
    {
        let config = Config::load().context("Failed to load configuration")?;
        let url = PostgrestBackend::new(&config)?.authorize_url(*provider, redirect_to.as_deref())?;
        println!("Open this URL to continue with {}:", provider);
        println!("{}", url);
        return Ok(());
    }

    let mut ctx = connect(args.demo).await?;
    let backend = ctx.backend.as_ref();

    match args.command {
        Command::Recent { limit } => {
            let listings =
                query::recent_listings(backend, limit.unwrap_or(ctx.recent_limit)).await?;
            print_listings(&listings, args.json)?;
        }
        Command::Explore { category } => {
            let listings = query::listings_by_category(backend, &category).await?;
            print_listings(&listings, args.json)?;
        }
        Command::Search {
            term,
            min_price,
            max_price,
            bedrooms,
            bathrooms,
            category,
        } => {
            let filters = SearchFilters {
                term,
                min_price,
                max_price,
                bedrooms,
                bathrooms,
                category,
            };
            let listings = query::search_listings(backend, &filters).await?;
            print_listings(&listings, args.json)?;
        }
        Command::Show { id } => match query::get_listing(backend, &id).await? {
            Some(listing) => {
                let favorite = favorites::is_favorite(backend, &ctx.session, &id).await;
                print_detail(&listing, favorite, args.json)?;
            }
            None => warn!("No listing with id {}", id),
        },
        Command::Favorite { id } => {
            match favorites::toggle_favorite(backend, &ctx.session, &id).await? {
                Some(favorites::FavoriteState::Favorited) => println!("♥ Added {} to favorites", id),
                Some(favorites::FavoriteState::Unfavorited) => {
                    println!("♡ Removed {} from favorites", id)
                }
                None => info!("Not signed in; favorite for {} left unchanged", id),
            }
        }
        Command::Favorites => {
            require_sign_in(&ctx.session)?;
            let listings = favorites::list_favorites(backend, &ctx.session).await?;
            print_listings(&listings, args.json)?;
        }
        Command::Profile => {
            require_sign_in(&ctx.session)?;
            if let Some(profile) = profile::load_profile(backend, &ctx.session).await? {
                print_profile(&profile, args.json)?;
            }
        }
        Command::Rename { name } => {
            require_sign_in(&ctx.session)?;
            if let Some(profile) =
                profile::update_display_name(backend, &ctx.session, &name).await?
            {
                print_profile(&profile, args.json)?;
            }
        }
        Command::Logout => {
            require_sign_in(&ctx.session)?;
            if let (Some(remote), Some(token)) = (&ctx.remote, ctx.session.access_token()) {
                remote.sign_out(token).await?;
            }
            ctx.session.sign_out();
            println!("Signed out");
        }
        // Printed before connecting
        Command::Login { .. } => {}
    }

    Ok(())
}
