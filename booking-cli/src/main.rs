//! Bookings CLI
//!
//! Command-line interface for the booking payment API.

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use booking_client::{BookingsClient, PaymentResult};
use booking_types::{
    BookedService, BookingId, BookingUser, CheckoutItem, CheckoutPayer, CheckoutRequest,
    CreateBookingRequest, Party,
};

#[derive(Parser)]
#[command(name = "bookings")]
#[command(author, version, about = "Booking payment API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the booking API
    #[arg(
        long,
        env = "BOOKINGS_API_URL",
        default_value = "http://localhost:3000"
    )]
    api_url: String,

    /// API token for authentication
    #[arg(long, env = "BOOKINGS_API_TOKEN")]
    api_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a booking request
    Book {
        #[command(flatten)]
        service: ServiceArgs,
        /// Unit price in major units
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        provider_name: String,
        #[arg(long)]
        provider_email: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        user_uid: String,
        #[command(flatten)]
        customer: CustomerArgs,
        #[arg(long)]
        location: Option<String>,
    },
    /// Open a hosted checkout session and print its URL
    Checkout {
        #[command(flatten)]
        service: ServiceArgs,
        /// Amount to charge in major units
        #[arg(long)]
        total_price: Decimal,
        #[command(flatten)]
        customer: CustomerArgs,
        #[arg(long)]
        location: Option<String>,
        /// Booking being paid for
        #[arg(long)]
        booking_id: Option<BookingId>,
    },
    /// Record the payment of a completed checkout session
    Confirm {
        /// Checkout session id from the success redirect
        session_id: String,
    },
    /// Show a ledger entry
    Payment {
        /// Gateway transaction id
        transaction_id: String,
    },
    /// Bootstrap the first API token
    Bootstrap {
        /// Name for the new token
        #[arg(long, default_value = "bootstrap-token")]
        name: String,
    },
    /// Check API health
    Health,
}

#[derive(clap::Args)]
struct ServiceArgs {
    #[arg(long)]
    service_id: String,
    #[arg(long)]
    service_name: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    image: Option<String>,
}

#[derive(clap::Args)]
struct CustomerArgs {
    /// Customer display name
    #[arg(long)]
    name: String,
    /// Customer email
    #[arg(long)]
    email: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = BookingsClient::new(&cli.api_url);
    if let Some(token) = cli.api_token {
        client = client.with_api_token(token);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Book {
            service,
            price,
            provider_name,
            provider_email,
            category,
            user_uid,
            customer,
            location,
        } => {
            let req = CreateBookingRequest {
                user: BookingUser {
                    uid: user_uid,
                    name: customer.name,
                    email: customer.email,
                },
                service: BookedService {
                    id: service.service_id,
                    name: service.service_name,
                    description: service.description,
                    price,
                    image: service.image,
                    category,
                    provider: Party {
                        name: provider_name,
                        email: provider_email,
                    },
                },
                location,
            };
            let booking = client.create_booking(&req).await?;
            println!("{}", serde_json::to_string_pretty(&booking)?);
        }

        Commands::Checkout {
            service,
            total_price,
            customer,
            location,
            booking_id,
        } => {
            let req = CheckoutRequest {
                service: CheckoutItem {
                    id: service.service_id,
                    name: service.service_name,
                    image: service.image,
                    description: service.description,
                    price: None,
                },
                total_price,
                user: CheckoutPayer {
                    name: customer.name,
                    email: customer.email,
                },
                location,
                booking_id,
            };
            let url = client.create_checkout_session(&req).await?;
            println!("{}", url);
        }

        Commands::Confirm { session_id } => match client.confirm_payment(&session_id).await? {
            PaymentResult::Confirmed(confirmation) => {
                println!("{}", serde_json::to_string_pretty(&confirmation)?);
            }
            PaymentResult::NotPayable(body) => {
                println!("{}", serde_json::to_string_pretty(&body)?);
                std::process::exit(2);
            }
        },

        Commands::Payment { transaction_id } => {
            let payment = client.get_payment(&transaction_id).await?;
            println!("{}", serde_json::to_string_pretty(&payment)?);
        }

        Commands::Bootstrap { name } => {
            let token = client.bootstrap(&name).await?;
            println!("{}", token);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_checkout() {
        let cli = Cli::try_parse_from([
            "bookings",
            "--api-token",
            "bk_test",
            "checkout",
            "--service-id",
            "S1",
            "--service-name",
            "Stage Decor",
            "--total-price",
            "500",
            "--name",
            "Nadia",
            "--email",
            "nadia@example.com",
        ])
        .unwrap();

        assert_eq!(cli.api_token.as_deref(), Some("bk_test"));
        match cli.command {
            Commands::Checkout {
                service,
                total_price,
                booking_id,
                ..
            } => {
                assert_eq!(service.service_id, "S1");
                assert_eq!(total_price, Decimal::from(500));
                assert!(booking_id.is_none());
            }
            _ => panic!("expected checkout command"),
        }
    }
}
