use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ledgerprims_session::ApduAnswer;
use ledgerprims_transport::DeviceDescriptor;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

#[derive(Serialize)]
struct DeviceOutput<'a> {
    vendor_id: String,
    product_id: String,
    model: &'static str,
    path: &'a str,
    product: Option<&'a str>,
    serial_number: Option<&'a str>,
}

impl<'a> From<&'a DeviceDescriptor> for DeviceOutput<'a> {
    fn from(d: &'a DeviceDescriptor) -> Self {
        Self {
            vendor_id: format!("{:04x}", d.vendor_id),
            product_id: format!("{:04x}", d.product_id),
            model: d.model().as_str(),
            path: &d.path,
            product: d.product.as_deref(),
            serial_number: d.serial_number.as_deref(),
        }
    }
}

pub fn print_devices(devices: &[DeviceDescriptor], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<DeviceOutput<'_>> = devices.iter().map(DeviceOutput::from).collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["VID:PID", "MODEL", "PRODUCT", "PATH"]);
            for d in devices {
                table.add_row(vec![
                    format!("{:04x}:{:04x}", d.vendor_id, d.product_id),
                    d.model().to_string(),
                    d.product.clone().unwrap_or_default(),
                    d.path.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for d in devices {
                println!("{d}");
            }
        }
        OutputFormat::Raw => {
            for d in devices {
                println!("{}", d.path);
            }
        }
    }
}

#[derive(Serialize)]
struct AnswerOutput<'a> {
    device: &'a str,
    data: String,
    status_word: String,
    success: bool,
}

pub fn print_answer(answer: &ApduAnswer, device: &DeviceDescriptor, format: OutputFormat) {
    let data = hex::encode(answer.data());
    let status_word = format!("{:04x}", answer.status_word());
    match format {
        OutputFormat::Json => {
            let out = AnswerOutput {
                device: &device.path,
                data,
                status_word,
                success: answer.is_success(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SW", "SIZE", "DATA"])
                .add_row(vec![status_word, answer.data().len().to_string(), data]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sw={status_word} size={} data={data}",
                answer.data().len()
            );
        }
        OutputFormat::Raw => {
            println!("{data}{status_word}");
        }
    }
}
