//! Veggie swap board daemon/CLI.
//!
//! A local-first board for neighbors swapping homegrown produce: browse and
//! submit listings, approve or reject them as admin, request swaps, and keep
//! a profile. State lives in an embedded database under the data directory;
//! `serve` keeps the board open and sweeps expired listings once a minute.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use veggieswap_common::filter::ListingFilter;
use veggieswap_common::listing::{
    default_expiry, Availability, Category, ItemType, Listing, ListingDraft, ListingId,
    RequestDraft,
};
use veggieswap_common::profile::UserProfile;
use veggieswap_node::board::SwapBoard;
use veggieswap_node::photo;
use veggieswap_store::LocalStore;

/// Seconds between expiry sweeps in serve mode.
const SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Parser)]
#[command(name = "veggieswap-node", about = "Neighborhood produce swap board")]
struct Cli {
    /// Data directory holding the board database.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Browse approved listings.
    List {
        /// Case-insensitive substring of title or description.
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        item_type: Option<ItemType>,
        #[arg(long)]
        availability: Option<Availability>,
    },

    /// Show listings awaiting approval (admin).
    Pending,

    /// Submit a new listing for approval.
    Submit {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "vegetables")]
        category: Category,
        #[arg(long, default_value = "produce")]
        item_type: ItemType,
        #[arg(long, default_value = "swap")]
        availability: Availability,
        #[arg(long)]
        quantity: Option<String>,
        /// Path to a photo to embed.
        #[arg(long)]
        photo: Option<PathBuf>,
        /// Defaults to the street in your profile.
        #[arg(long)]
        street: Option<String>,
        /// Defaults to the house number in your profile.
        #[arg(long)]
        house_number: Option<String>,
        /// Defaults to the name in your profile.
        #[arg(long)]
        owner_name: Option<String>,
        /// What you would like in return (swap listings).
        #[arg(long)]
        looking_for: Option<String>,
        /// Defaults to one week from now.
        #[arg(long)]
        expires_in_days: Option<i64>,
    },

    /// Approve a pending listing (admin).
    Approve { id: i64 },

    /// Reject a pending listing (admin).
    Reject { id: i64 },

    /// Express interest in an active listing.
    Request {
        id: i64,
        /// Defaults to the name in your profile.
        #[arg(long)]
        requester: Option<String>,
        #[arg(long)]
        message: Option<String>,
        /// What you can offer in return.
        #[arg(long)]
        offer: Option<String>,
    },

    /// Remove one of your approved listings.
    Delete { id: i64 },

    /// Show or update your profile.
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },

    /// Show who holds the admin role.
    Admin,

    /// Drop expired listings once.
    Sweep,

    /// Keep the board open, sweeping expired listings every minute.
    Serve,
}

#[derive(Subcommand)]
enum ProfileCommand {
    Show,
    Set {
        #[arg(long)]
        name: String,
        #[arg(long)]
        street: String,
        #[arg(long)]
        house_number: String,
        /// Path to a profile photo to embed.
        #[arg(long)]
        photo: Option<PathBuf>,
        /// What you grow.
        #[arg(long)]
        produces: Option<String>,
        #[arg(long)]
        looking_for: Option<String>,
    },
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("veggieswap"))
        .unwrap_or_else(|| PathBuf::from(".veggieswap"))
}

fn print_listing(listing: &Listing) {
    println!(
        "{}  {} [{} / {} / {}]",
        listing.id, listing.title, listing.category, listing.item_type, listing.availability
    );
    if !listing.description.is_empty() {
        println!("      {}", listing.description);
    }
    if let Some(quantity) = &listing.quantity {
        println!("      quantity: {quantity}");
    }
    if let Some(looking_for) = &listing.looking_for {
        println!("      looking for: {looking_for}");
    }
    println!(
        "      {} — by {} — expires {} — {} request(s)",
        listing.street_number,
        listing.owner_name,
        listing.expiry_date.format("%Y-%m-%d"),
        listing.requests.len()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let store = LocalStore::open(&data_dir.join("board.redb"))?;
    let board = SwapBoard::open(store)?;

    match cli.command {
        Command::List {
            query,
            category,
            item_type,
            availability,
        } => {
            let filter = ListingFilter {
                query,
                category,
                item_type,
                availability,
            };
            let listings = board.listings();
            let matched = filter.apply(&listings);
            if matched.is_empty() {
                println!("No listings yet. Be the first to share!");
            }
            for listing in matched {
                print_listing(listing);
            }
        }

        Command::Pending => {
            let pending = board.pending_listings();
            if pending.is_empty() {
                println!("Nothing awaiting approval.");
            }
            for listing in &pending {
                print_listing(listing);
            }
        }

        Command::Submit {
            title,
            description,
            category,
            item_type,
            availability,
            quantity,
            photo,
            street,
            house_number,
            owner_name,
            looking_for,
            expires_in_days,
        } => {
            let photo = photo
                .map(|path| photo::data_url_from_file(&path))
                .transpose()?;
            let draft = ListingDraft {
                title,
                description,
                category,
                item_type,
                availability,
                quantity,
                photo,
                street,
                house_number,
                owner_name,
                looking_for,
                expiry_date: match expires_in_days {
                    Some(days) => Utc::now() + chrono::Duration::days(days),
                    None => default_expiry(Utc::now()),
                },
            };
            match board.submit_listing(draft) {
                Ok(listing) => {
                    println!("Listing {} submitted for approval.", listing.id)
                }
                Err(err) => {
                    error!(%err, "submit failed");
                    bail!("failed to add listing, please try again");
                }
            }
        }

        Command::Approve { id } => {
            if !board.is_admin() {
                bail!("only the admin can approve listings");
            }
            match board.approve(ListingId(id)) {
                Ok(true) => println!("Listing {id} approved."),
                Ok(false) => println!("Listing {id} is not pending."),
                Err(err) => {
                    error!(%err, "approve failed");
                    bail!("failed to approve listing, please try again");
                }
            }
        }

        Command::Reject { id } => {
            if !board.is_admin() {
                bail!("only the admin can reject listings");
            }
            match board.reject(ListingId(id)) {
                Ok(true) => println!("Listing {id} rejected."),
                Ok(false) => println!("Listing {id} is not pending."),
                Err(err) => {
                    error!(%err, "reject failed");
                    bail!("failed to reject listing, please try again");
                }
            }
        }

        Command::Request {
            id,
            requester,
            message,
            offer,
        } => {
            let draft = RequestDraft {
                requester,
                message,
                offer,
            };
            if board.add_request(ListingId(id), draft)? {
                println!("Request sent.");
            } else {
                println!("Listing {id} is no longer on the board.");
            }
        }

        Command::Delete { id } => {
            if board.delete_listing(ListingId(id))? {
                println!("Listing {id} deleted.");
            } else {
                println!("Listing {id} is not on the board.");
            }
        }

        Command::Profile { action } => match action {
            ProfileCommand::Show => match board.profile() {
                Some(profile) => {
                    println!("{} — {} {}", profile.name, profile.house_number, profile.street);
                    if let Some(produces) = &profile.produces_available {
                        println!("grows: {produces}");
                    }
                    if let Some(looking_for) = &profile.looking_for {
                        println!("looking for: {looking_for}");
                    }
                }
                None => println!("No profile yet. Create one with `profile set`."),
            },
            ProfileCommand::Set {
                name,
                street,
                house_number,
                photo,
                produces,
                looking_for,
            } => {
                let photo = photo
                    .map(|path| photo::data_url_from_file(&path))
                    .transpose()?;
                let profile = UserProfile {
                    name,
                    photo,
                    street,
                    house_number,
                    produces_available: produces,
                    looking_for,
                };
                let newly_admin = board.save_profile(profile)?;
                println!("Profile saved.");
                if newly_admin {
                    println!(
                        "Congratulations, you are now the admin! \
                         You can approve and reject pending listings."
                    );
                }
            }
        },

        Command::Admin => match board.admin_id() {
            Some(admin) if board.user_id() == &admin => {
                println!("You are the admin ({admin}).")
            }
            Some(admin) => println!("Admin is {admin}."),
            None => println!("No admin yet; the first saved profile claims the role."),
        },

        Command::Sweep => {
            let removed = board.sweep_expired(Utc::now())?;
            println!("Removed {removed} expired listing(s).");
        }

        Command::Serve => {
            info!(every_secs = SWEEP_INTERVAL_SECS, "board open, sweeping expired listings");
            let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match board.sweep_expired(Utc::now()) {
                            Ok(0) => {}
                            Ok(removed) => info!(removed, "expired listings swept"),
                            Err(err) => warn!(%err, "expiry sweep failed"),
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutting down");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
