use std::io::{IsTerminal, Write};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    /// One compact JSON object per line.
    Json,
    /// Human-readable table.
    Table,
    /// Indented JSON.
    Pretty,
    /// Payload bytes only.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A received frame plus where and when it came from.
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    pub peer: Option<SocketAddr>,
    pub seq: u64,
    pub payload: bytes::Bytes,
    /// Time since the connection was accepted.
    pub elapsed: Duration,
}

#[derive(Serialize)]
struct FrameOutput {
    seq: u64,
    peer: String,
    payload_size: usize,
    payload: String,
    timestamp: u64,
    elapsed_ms: u64,
}

impl From<&ReceivedFrame> for FrameOutput {
    fn from(frame: &ReceivedFrame) -> Self {
        Self {
            seq: frame.seq,
            peer: peer_label(frame.peer),
            payload_size: frame.payload.len(),
            payload: payload_preview(frame.payload.as_ref()),
            timestamp: now_unix_seconds(),
            elapsed_ms: u64::try_from(frame.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

pub fn print_frame(frame: &ReceivedFrame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput::from(frame);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Pretty => {
            let out = FrameOutput::from(frame);
            println!(
                "{}",
                serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "PEER", "SIZE", "ELAPSED", "PAYLOAD"])
                .add_row(vec![
                    frame.seq.to_string(),
                    peer_label(frame.peer),
                    frame.payload.len().to_string(),
                    format!("{}ms", frame.elapsed.as_millis()),
                    payload_preview(frame.payload.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Raw => {
            print_raw(frame.payload.as_ref());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn peer_label(peer: Option<SocketAddr>) -> String {
    peer.map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

pub fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
