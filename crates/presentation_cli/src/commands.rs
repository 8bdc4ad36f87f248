//! Command implementations
//!
//! Commands write to any [`Write`] so they can be exercised without a terminal.

use std::io::Write;
use std::time::Duration;

use integration_emt::{ArrivalsClient, Stop};
use tracing::debug;

/// How a stop is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// One JSON document per snapshot
    Json,
}

/// Refresh schedule for the `stop` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refresh {
    /// Number of refreshes after the initial fetch
    pub count: u32,
    /// Pause before each refresh
    pub interval: Duration,
}

/// Fetch a stop, print it, then refresh and reprint it `refresh.count` times
pub async fn show_stop<C, W>(
    client: &C,
    stop_id: u32,
    format: OutputFormat,
    refresh: Refresh,
    out: &mut W,
) -> anyhow::Result<()>
where
    C: ArrivalsClient + ?Sized,
    W: Write,
{
    let mut stop = client.get_stop(stop_id).await?;
    print_stop(&stop, format, out)?;

    for round in 1..=refresh.count {
        tokio::time::sleep(refresh.interval).await;
        debug!(round, "Refreshing arrivals");
        client.refresh_arrivals(&mut stop).await?;
        print_stop(&stop, format, out)?;
    }

    Ok(())
}

/// Check the session token and report whether it is active
///
/// Returns `Ok(false)` when the server rejects the token; other failures are
/// propagated.
pub async fn check_token<C, W>(client: &C, out: &mut W) -> anyhow::Result<bool>
where
    C: ArrivalsClient + ?Sized,
    W: Write,
{
    match client.is_token_active().await {
        Ok(()) => {
            writeln!(out, "✅ Access token is active")?;
            Ok(true)
        },
        Err(e) if e.server_code().is_some() => {
            writeln!(out, "❌ Access token rejected: {e}")?;
            Ok(false)
        },
        Err(e) => Err(e.into()),
    }
}

fn print_stop<W: Write>(stop: &Stop, format: OutputFormat, out: &mut W) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{stop}")?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, stop)?;
            writeln!(out)?;
        },
    }
    Ok(())
}
