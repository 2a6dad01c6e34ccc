use std::net::Ipv4Addr;
use std::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::decoder::{Completion, Decoder};
use crate::error::{CellularError, Result};
use crate::location::LocationFix;
use crate::poll::{self, Clock, PollPolicy, SystemClock};
use crate::psm::PsmStatus;
use crate::registration::Registration;
use crate::response::{PlusResponse, SignalQuality, TextResponse};
use crate::scan;
use crate::survey::EnvironmentSurvey;
use crate::transport::Transport;
#[cfg(feature = "serial")]
use crate::transport::serial::{self, SerialTransport};

/// `AT+UDOPN` name types.
pub mod operator_name {
    /// MCC/MNC in numeric form.
    pub const NUMERIC: u8 = 0;
    /// Long name from EONS; falls back to NITZ, CPHS, then ROM.
    pub const LONG_EONS: u8 = 9;
}

/// Timeouts and pacing for modem operations.
#[derive(Debug, Clone)]
pub struct ModemConfig {
    /// Timeout for ordinary commands.
    pub command_timeout: Duration,
    /// Timeout for the empty commands used to pick up late unsolicited lines.
    pub probe_timeout: Duration,
    /// Pause between PSM indication probes.
    pub psm_poll_interval: Duration,
    /// How long to wait for `+UUPSMR: 1` after enabling PSM.
    pub psm_enter_timeout: Duration,
    /// How long to wait for `+UUPSMR: 0` after pulsing the power line.
    pub psm_exit_timeout: Duration,
    /// How long the power line is held low to wake the modem.
    pub power_pulse: Duration,
    /// Timeout for `AT+ULOCCELL`.
    pub location_init_timeout: Duration,
    /// Pause between probes for a late `+UULOC`.
    pub location_poll_interval: Duration,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_millis(500),
            psm_poll_interval: Duration::from_millis(100),
            psm_enter_timeout: Duration::from_secs(30),
            psm_exit_timeout: Duration::from_secs(10),
            power_pulse: Duration::from_millis(150),
            location_init_timeout: Duration::from_secs(5),
            location_poll_interval: Duration::from_millis(10),
        }
    }
}

/// Issue one command and route its response through `decoder`.
fn issue<T: Transport + ?Sized>(
    transport: &mut T,
    command: &str,
    timeout: Duration,
    decoder: &mut Decoder<'_>,
) -> Result<Completion> {
    let completion = transport.command(command, timeout, &mut |kind, bytes: &[u8]| {
        decoder.feed(kind, bytes)
    })?;
    decoder.complete(completion);
    Ok(completion)
}

/// Finalize, logging rather than propagating a grammar mismatch.
fn settle(decoder: &mut Decoder<'_>) {
    if let Err(e) = decoder.finalize() {
        debug!("{e}");
    }
}

fn expect_ok(command: &str, completion: Completion) -> Result<()> {
    if completion.is_ok() {
        Ok(())
    } else {
        Err(CellularError::Command {
            command: command.to_string(),
            completion,
        })
    }
}

/// A cellular modem reached through an AT command transport.
pub struct Modem<T, C = SystemClock> {
    transport: T,
    clock: C,
    config: ModemConfig,
}

impl<T: Transport> Modem<T> {
    /// Wrap `transport` with the default configuration and wall-clock time.
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, SystemClock, ModemConfig::default())
    }
}

#[cfg(feature = "serial")]
impl Modem<SerialTransport> {
    /// Find the first USB serial port whose product string contains
    /// `product` and open it at `baud_rate`.
    pub fn auto_connect(product: &str, baud_rate: u32) -> Result<Self> {
        let port_name = serial::find_port(product)?;
        Ok(Self::new(serial::open_port(&port_name, baud_rate)?))
    }
}

impl<T: Transport, C: Clock> Modem<T, C> {
    /// Wrap `transport` with an explicit clock and configuration.
    pub fn with_clock(transport: T, clock: C, config: ModemConfig) -> Self {
        Self {
            transport,
            clock,
            config,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Mutable access to the configuration, e.g. to shorten timeouts.
    pub fn config_mut(&mut self) -> &mut ModemConfig {
        &mut self.config
    }

    /// Give back the underlying transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send a command with the default timeout and decode its response.
    pub fn command<'d>(
        &mut self,
        command: &str,
        decoder: impl Into<Decoder<'d>>,
    ) -> Result<Completion> {
        let timeout = self.config.command_timeout;
        self.command_with_timeout(command, timeout, decoder)
    }

    /// Send a command with an explicit timeout and decode its response.
    pub fn command_with_timeout<'d>(
        &mut self,
        command: &str,
        timeout: Duration,
        decoder: impl Into<Decoder<'d>>,
    ) -> Result<Completion> {
        issue(&mut self.transport, command, timeout, &mut decoder.into())
    }

    /// Send a command whose response text is not needed.
    pub fn send(&mut self, command: &str) -> Result<Completion> {
        let timeout = self.config.command_timeout;
        issue(&mut self.transport, command, timeout, &mut Decoder::Discard)
    }

    /// Send a configuration command, logging anything but OK.
    fn send_logged(&mut self, command: &str) -> Result<Completion> {
        let completion = self.send(command)?;
        if !completion.is_ok() {
            warn!("{command} answered {completion}");
        }
        Ok(completion)
    }

    /// Plain-text answer with line terminators removed.
    fn text(&mut self, command: &str) -> Result<String> {
        let mut resp = TextResponse::default();
        let completion = self.command(command, &mut resp)?;
        expect_ok(command, completion)?;
        Ok(resp.text.replace(['\r', '\n'], ""))
    }

    fn plus(&mut self, command: &str, key: &str) -> Result<PlusResponse> {
        let mut resp = PlusResponse::new(key);
        let completion = self.command(command, &mut resp)?;
        expect_ok(command, completion)?;
        Ok(resp)
    }

    // --- Identity ---

    /// Manufacturer name (`AT+CGMI`), e.g. `u-blox`.
    pub fn manufacturer(&mut self) -> Result<String> {
        self.text("AT+CGMI")
    }

    /// Model name (`AT+CGMM`), e.g. `SARA-R410M-02B`.
    pub fn model(&mut self) -> Result<String> {
        self.text("AT+CGMM")
    }

    /// Type/ordering code, e.g. `SARA-U260-00S-00`.
    pub fn ordering_code(&mut self) -> Result<String> {
        self.text("ATI0")
    }

    /// Firmware version (`AT+CGMR`).
    pub fn firmware_version(&mut self) -> Result<String> {
        self.text("AT+CGMR")
    }

    /// IMEI of the module (`AT+CGSN`).
    pub fn imei(&mut self) -> Result<String> {
        self.text("AT+CGSN")
    }

    /// Sends `AT+CGMI`, the same command as [`manufacturer`](Self::manufacturer).
    pub fn imsi(&mut self) -> Result<String> {
        self.text("AT+CGMI")
    }

    /// ICCID of the inserted SIM (`AT+CCID`).
    pub fn iccid(&mut self) -> Result<String> {
        Ok(self.plus("AT+CCID", "CCID")?.text)
    }

    /// Returns `true` for SARA-R4 (LTE Cat M1 / NB1) modules.
    pub fn is_lte(&mut self) -> Result<bool> {
        Ok(self.model()?.contains("SARA-R4"))
    }

    /// Operator name of the given [`operator_name`] type.
    pub fn operator_name(&mut self, name_type: u8) -> Result<String> {
        let resp = self.plus(&format!("AT+UDOPN={name_type}"), "UDOPN")?;
        Ok(resp.quoted_part(true))
    }

    // --- Signal and network ---

    /// Query `AT+CSQ`. An unparsable answer comes back with `valid == false`.
    pub fn signal_quality(&mut self) -> Result<SignalQuality> {
        let mut resp = SignalQuality::default();
        let completion = self.command("AT+CSQ", &mut resp)?;
        expect_ok("AT+CSQ", completion)?;
        settle(&mut Decoder::from(&mut resp));
        Ok(resp)
    }

    /// Run a cell survey (`AT+CGED=<mode>`) into `survey`, clearing it first.
    pub fn environment(&mut self, mode: u8, survey: &mut EnvironmentSurvey) -> Result<()> {
        survey.clear();
        let command = format!("AT+CGED={mode}");
        let completion = self.command(&command, &mut *survey)?;
        expect_ok(&command, completion)
    }

    /// Circuit-switched registration. Enables location reporting for the
    /// query and restores the default afterwards.
    pub fn creg(&mut self) -> Result<Registration> {
        let completion = self.send("AT+CREG=2")?;
        expect_ok("AT+CREG=2", completion)?;

        let mut reg = Registration::creg();
        let completion = self.command("AT+CREG?", &mut reg)?;
        expect_ok("AT+CREG?", completion)?;
        settle(&mut Decoder::from(&mut reg));

        self.send_logged("AT+CREG=0")?;
        Ok(reg)
    }

    /// EPS registration.
    pub fn cereg(&mut self) -> Result<Registration> {
        let mut reg = Registration::cereg();
        let completion = self.command("AT+CEREG?", &mut reg)?;
        expect_ok("AT+CEREG?", completion)?;
        settle(&mut Decoder::from(&mut reg));
        Ok(reg)
    }

    /// Returns `true` when registered to the home network or roaming.
    pub fn is_registered(&mut self) -> Result<bool> {
        let reg = self.cereg()?;
        info!("CEREG {reg}");
        Ok(reg.is_registered())
    }

    /// Raw `+COPS` payload: selection mode, format, operator and access
    /// technology.
    pub fn cops(&mut self) -> Result<String> {
        Ok(self.plus("AT+COPS?", "COPS")?.text)
    }

    /// Raw `+CREG` payload, without changing the reporting mode.
    pub fn creg_text(&mut self) -> Result<String> {
        Ok(self.plus("AT+CREG?", "CREG")?.text)
    }

    /// Raw `+CEREG` payload, without parsing it.
    pub fn cereg_text(&mut self) -> Result<String> {
        Ok(self.plus("AT+CEREG?", "CEREG")?.text)
    }

    /// Select the radio access technology: deregister, `AT+URAT`, re-register.
    pub fn set_rat(&mut self, primary: u8, secondary: Option<u8>) -> Result<()> {
        let urat = match secondary {
            Some(secondary) => format!("AT+URAT={primary},{secondary}"),
            None => format!("AT+URAT={primary}"),
        };
        self.send_logged("AT+COPS=2")?;
        self.send_logged(&urat)?;
        let completion = self.send("AT+COPS=0")?;
        expect_ok("AT+COPS=0", completion)
    }

    /// Raw `+URAT` payload: the selected access technologies.
    pub fn rat(&mut self) -> Result<String> {
        Ok(self.plus("AT+URAT?", "URAT")?.text)
    }

    /// Select a mobile network operator profile and reboot the modem.
    pub fn set_mno(&mut self, profile: u8) -> Result<()> {
        self.send_logged("AT+COPS=2")?;
        self.send_logged(&format!("AT+UMNOPROF={profile}"))?;
        let completion = self.send("AT+CFUN=15")?;
        expect_ok("AT+CFUN=15", completion)
    }

    /// Current MNO profile; 0 if the modem did not report one.
    pub fn mno(&mut self) -> Result<i32> {
        let resp = self.plus("AT+UMNOPROF?", "UMNOPROF")?;
        Ok(scan::dec_or_zero(&resp.text))
    }

    // --- Power save mode ---

    /// Raw `+CPSMS` payload: the PSM timers requested by the module.
    pub fn local_psm_settings(&mut self) -> Result<String> {
        Ok(self.plus("AT+CPSMS?", "CPSMS")?.text)
    }

    /// Raw `+UCPSMS` payload: the PSM timers granted by the network.
    pub fn network_psm_settings(&mut self) -> Result<String> {
        Ok(self.plus("AT+UCPSMS?", "UCPSMS")?.text)
    }

    /// Configure PSM (6 h periodic TAU, 10 s active time), reboot, and wait
    /// for the modem to report that it entered PSM.
    ///
    /// Returns `Ok(false)` if the modem is not registered or never reports
    /// `+UUPSMR: 1` within [`ModemConfig::psm_enter_timeout`].
    pub fn enter_psm(&mut self) -> Result<bool> {
        if !self.is_registered()? {
            info!("not registered, not entering PSM");
            return Ok(false);
        }

        for command in [
            // network coordination mode only
            "AT+UPSMVER=4",
            "AT+CFUN=15",
            "AT+UPSMVER?",
            "AT+CPSMS=1,,,\"00100110\",\"00000101\"",
            // radio connection status indication
            "AT+CSCON=1",
            // PSM indication
            "AT+UPSMR=1",
            "AT+CFUN=15",
        ] {
            self.send_logged(command)?;
        }

        let policy = PollPolicy::new(self.config.psm_enter_timeout, self.config.psm_poll_interval);
        self.wait_for_psm(policy, PsmStatus::entered)
    }

    /// Turn PSM off and reboot the modem.
    pub fn disable_psm(&mut self) -> Result<()> {
        self.send_logged("AT+CPSMS=0")?;
        let completion = self.send("AT+CFUN=15")?;
        expect_ok("AT+CFUN=15", completion)
    }

    /// Wake the modem by pulsing its power line low, then wait for
    /// `+UUPSMR: 0`.
    pub fn exit_psm<P: OutputPin>(&mut self, power: &mut P) -> Result<bool> {
        power.set_low().map_err(|_| CellularError::Pin)?;
        self.clock.sleep(self.config.power_pulse);
        power.set_high().map_err(|_| CellularError::Pin)?;

        let policy = PollPolicy::new(self.config.psm_exit_timeout, self.config.psm_poll_interval);
        self.wait_for_psm(policy, PsmStatus::exited)
    }

    /// Probe with empty commands until `done` holds for the PSM indication.
    fn wait_for_psm(&mut self, policy: PollPolicy, done: fn(&PsmStatus) -> bool) -> Result<bool> {
        let Self {
            transport,
            clock,
            config,
        } = self;
        let probe_timeout = config.probe_timeout;
        let mut status = PsmStatus::default();
        let mut failure = None;

        let reached = poll::poll_until(clock, policy, || {
            let mut decoder = Decoder::from(&mut status);
            if let Err(e) = issue(transport, "", probe_timeout, &mut decoder) {
                failure = Some(e);
                return true;
            }
            settle(&mut decoder);
            done(&status)
        });

        match failure {
            Some(e) => Err(e),
            None => {
                debug!("PSM wait finished: {status}");
                Ok(reached)
            }
        }
    }

    // --- Location ---

    /// Request a cell-based location fix, waiting up to `timeout` for the
    /// `+UULOC` line, which usually arrives after the command's OK.
    ///
    /// A fix that never arrives comes back with `valid == false`.
    pub fn location(&mut self, timeout: Duration) -> Result<LocationFix> {
        let Self {
            transport,
            clock,
            config,
        } = self;

        let completion = issue(
            transport,
            "AT+ULOCCELL=0",
            config.location_init_timeout,
            &mut Decoder::Discard,
        )?;
        expect_ok("AT+ULOCCELL=0", completion)?;

        let start = clock.now();
        let mut fix = LocationFix::default();
        let command = format!("AT+ULOC=2,2,0,{},5000", timeout.as_secs());
        let completion = issue(transport, &command, timeout, &mut Decoder::from(&mut fix))?;
        expect_ok(&command, completion)?;
        settle(&mut Decoder::from(&mut fix));
        if fix.valid {
            return Ok(fix);
        }

        let probe_timeout = config.probe_timeout;
        let policy = PollPolicy::new(timeout, config.location_poll_interval);
        let mut failure = None;
        poll::poll_until_since(clock, start, policy, || {
            let mut decoder = Decoder::from(&mut fix);
            if let Err(e) = issue(transport, "", probe_timeout, &mut decoder) {
                failure = Some(e);
                return true;
            }
            settle(&mut decoder);
            fix.valid
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(fix),
        }
    }

    // --- IP ---

    /// Returns `true` if the modem accepted the ping request.
    pub fn ping(&mut self, host: &str) -> Result<bool> {
        let completion = self.send(&format!("AT+UPING=\"{host}\""))?;
        Ok(completion.is_ok())
    }

    /// Resolve `hostname` to an IPv4 address; `None` if the modem could not.
    pub fn dns_lookup(&mut self, hostname: &str) -> Result<Option<Ipv4Addr>> {
        let mut resp = PlusResponse::new("UDNSRN");
        let completion = self.command(&format!("AT+UDNSRN=0,\"{hostname}\""), &mut resp)?;
        if !completion.is_ok() {
            debug!("DNS lookup of {hostname} answered {completion}");
            return Ok(None);
        }
        Ok(resp.quoted_part(true).parse().ok())
    }
}
