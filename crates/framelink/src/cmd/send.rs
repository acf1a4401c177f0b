use std::fs;
use std::time::{Duration, Instant};

use framelink_peer::dial_with_config;

use crate::cmd::SendArgs;
use crate::exit::{io_error, peer_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat, ReceivedFrame};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let mut config = args.frame.connection_config();
    if args.wait {
        config.read_timeout = Some(wait_timeout);
    }

    let mut conn =
        dial_with_config(&args.addr, &config).map_err(|err| peer_error("connect failed", err))?;
    let connected = Instant::now();

    conn.send(&payload)
        .map_err(|err| peer_error("send failed", err))?;
    tracing::debug!(addr = %args.addr, size = payload.len(), "frame sent");

    if args.wait {
        let reply = conn
            .receive()
            .map_err(|err| peer_error("receive failed", err))?;
        let frame = ReceivedFrame {
            peer: conn.peer_addr(),
            seq: 1,
            payload: reply,
            elapsed: connected.elapsed(),
        };
        print_frame(&frame, format);
    }

    let _ = conn.close();
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
