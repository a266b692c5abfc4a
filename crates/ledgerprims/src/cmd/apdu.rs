use std::sync::Arc;
use std::time::Duration;

use ledgerprims_session::{ApduCommand, Session, SessionConfig};
use ledgerprims_transport::{DeviceDescriptor, Transport};
use tracing::debug;

use crate::cmd::ApduArgs;
use crate::exit::{
    session_error, CliError, CliResult, DEVICE_NOT_FOUND, FAILURE, INTERNAL, SUCCESS, USAGE,
};
use crate::output::{print_answer, OutputFormat};

pub fn run(args: ApduArgs, format: OutputFormat) -> CliResult<i32> {
    let command = parse_command(&args.command)?;
    let config = SessionConfig {
        read_timeout: parse_duration("read timeout", &args.read_timeout)?,
        exchange_timeout: parse_duration("timeout", &args.timeout)?,
        ..SessionConfig::default()
    };

    let device = select_device(args.path.as_deref())?;
    let transport = open_transport(&device)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start runtime: {err}")))?;

    let answer = runtime.block_on(async {
        let session = Session::new(transport, device, config);
        session
            .open()
            .await
            .map_err(|err| session_error("open failed", err))?;
        let result = session.exchange_apdu(&command).await;
        if let Err(err) = session.close().await {
            debug!(error = %err, "close after exchange failed");
        }
        let answer = result.map_err(|err| session_error("exchange failed", err))?;
        print_answer(&answer, session.device(), format);
        Ok::<_, CliError>(answer)
    })?;

    if answer.is_success() {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

/// Parse `CLA INS P1 P2 [Lc DATA]` from hex.
fn parse_command(input: &str) -> CliResult<ApduCommand> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = hex::decode(&cleaned)
        .map_err(|err| CliError::new(USAGE, format!("invalid apdu hex: {err}")))?;

    let [cla, ins, p1, p2, rest @ ..] = bytes.as_slice() else {
        return Err(CliError::new(
            USAGE,
            "apdu needs at least 4 bytes (CLA INS P1 P2)",
        ));
    };
    let command = ApduCommand::new(*cla, *ins, *p1, *p2);
    match rest {
        [] => Ok(command),
        [lc, data @ ..] if usize::from(*lc) == data.len() => Ok(command.with_data(data.to_vec())),
        [lc, data @ ..] => Err(CliError::new(
            USAGE,
            format!("Lc is {lc} but {} data bytes follow", data.len()),
        )),
    }
}

fn parse_duration(name: &str, input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, format!("{name} must not be empty")));
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
        .map_err(|_| CliError::new(USAGE, format!("invalid {name} value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, format!("{name} must be greater than zero")));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

fn select_device(path: Option<&str>) -> CliResult<DeviceDescriptor> {
    let devices = crate::cmd::list::discover()?;
    let found = match path {
        Some(path) => devices.into_iter().find(|d| d.path == path),
        None => devices.into_iter().next(),
    };
    found.ok_or_else(|| match path {
        Some(path) => CliError::new(DEVICE_NOT_FOUND, format!("no supported device at {path}")),
        None => CliError::new(DEVICE_NOT_FOUND, "no supported device attached"),
    })
}

#[cfg(feature = "hid")]
fn open_transport(device: &DeviceDescriptor) -> CliResult<Arc<dyn Transport>> {
    Ok(Arc::new(ledgerprims_transport::HidTransport::new(device.clone())))
}

#[cfg(not(feature = "hid"))]
fn open_transport(_device: &DeviceDescriptor) -> CliResult<Arc<dyn Transport>> {
    Err(CliError::new(
        FAILURE,
        "built without USB HID support (enable the `hid` feature)",
    ))
}
