use std::process;
use std::time::Duration;

use log::info;

use cellular_helper::survey::EnvironmentSurvey;
use cellular_helper::transport::serial;
use cellular_helper::{Modem, Result, Transport};

const DEFAULT_PRODUCT: &str = "u-blox";
const DEFAULT_BAUD: u32 = 115_200;
const SURVEY_NEIGHBORS: usize = 5;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args = std::env::args().skip(1);
    let port = args.next();
    let baud_rate = match args.next().map(|b| b.parse::<u32>()) {
        None => DEFAULT_BAUD,
        Some(Ok(b)) => b,
        Some(Err(e)) => {
            eprintln!("invalid baud rate: {e}");
            eprintln!("usage: cellular-helper [PORT] [BAUD]");
            process::exit(2);
        }
    };

    let connected = match port {
        Some(name) => serial::open_port(&name, baud_rate).map(Modem::new),
        None => Modem::auto_connect(DEFAULT_PRODUCT, baud_rate),
    };
    let mut modem = match connected {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to connect: {e}");
            eprintln!();
            eprintln!("Troubleshooting:");
            eprintln!("  1. Pass the port explicitly: cellular-helper /dev/ttyACM0 115200");
            eprintln!("  2. Check that the modem's USB serial port is enumerated");
            eprintln!("  3. Close any other program holding the port");
            process::exit(1);
        }
    };

    if let Err(e) = report(&mut modem) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn report<T: Transport>(modem: &mut Modem<T>) -> Result<()> {
    println!("Manufacturer: {}", modem.manufacturer()?);
    println!("Model:        {}", modem.model()?);
    println!("Firmware:     {}", modem.firmware_version()?);
    println!("IMEI:         {}", modem.imei()?);
    println!("ICCID:        {}", modem.iccid()?);

    let signal = modem.signal_quality()?;
    if signal.valid {
        println!(
            "Signal:       {} dBm, qual {} ({} bars)",
            signal.rssi,
            signal.qual,
            signal.bars()
        );
    } else {
        println!("Signal:       unknown");
    }

    let reg = modem.cereg()?;
    println!("CEREG:        {reg}");

    let mut survey = EnvironmentSurvey::with_capacity(SURVEY_NEIGHBORS);
    match modem.environment(5, &mut survey) {
        Ok(()) => {
            println!("Serving:      {}", survey.serving);
            for cell in survey.neighbors() {
                println!("Neighbor:     {cell}");
            }
            survey.log_summary();
        }
        Err(e) => info!("cell survey unavailable: {e}"),
    }

    match modem.location(Duration::from_secs(10)) {
        Ok(fix) => println!("Location:     {fix}"),
        Err(e) => info!("cell location unavailable: {e}"),
    }
    Ok(())
}
