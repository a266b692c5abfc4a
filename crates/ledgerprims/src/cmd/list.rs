use ledgerprims_transport::DeviceDescriptor;

use crate::cmd::ListArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_devices, OutputFormat};

pub fn run(_args: ListArgs, format: OutputFormat) -> CliResult<i32> {
    let devices = discover()?;
    tracing::debug!(count = devices.len(), "devices listed");
    print_devices(&devices, format);
    Ok(SUCCESS)
}

#[cfg(feature = "hid")]
pub fn discover() -> CliResult<Vec<DeviceDescriptor>> {
    use ledgerprims_transport::{HidTransport, Transport};

    HidTransport::discover().map_err(|err| crate::exit::transport_error("discovery failed", err))
}

#[cfg(not(feature = "hid"))]
pub fn discover() -> CliResult<Vec<DeviceDescriptor>> {
    Err(crate::exit::CliError::new(
        crate::exit::FAILURE,
        "built without USB HID support (enable the `hid` feature)",
    ))
}
