use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ledgerprims {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ledgerprims");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("LEDGERPRIMS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: hid={}, cli=true", cfg!(feature = "hid"));
    println!(
        "defaults: packet_size={}, channel=0x{:04x}, read_timeout={}s, exchange_timeout={}s",
        ledgerprims_frame::DEFAULT_PACKET_SIZE,
        ledgerprims_frame::DEFAULT_CHANNEL,
        ledgerprims_session::DEFAULT_READ_TIMEOUT.as_secs(),
        ledgerprims_session::DEFAULT_EXCHANGE_TIMEOUT.as_secs()
    );

    Ok(SUCCESS)
}
