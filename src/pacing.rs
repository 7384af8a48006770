use std::io::{self, BufRead, Write};
use std::thread::sleep;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result, WrapErr};

/// How long to wait between two execution steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Wait for the operator to press enter
    Manual,
    /// Sleep for a fixed time
    Interval(Duration),
}

impl Pacing {
    /// Turns a clock rate in hertz into a pacing. No rate, or a rate of zero, means manual stepping.
    pub fn from_hz(hz: Option<f64>) -> Result<Self> {
        match hz {
            None => Ok(Pacing::Manual),
            Some(hz) if hz == 0.0 => Ok(Pacing::Manual),
            Some(hz) if hz.is_finite() && hz > 0.0 => Duration::try_from_secs_f64(1.0 / hz)
                .map(Pacing::Interval)
                .map_err(|err| eyre!("invalid clock rate `{}`: {}", hz, err)),
            Some(hz) => Err(eyre!("invalid clock rate `{}`", hz)),
        }
    }

    /// Blocks until the next step may run
    pub fn wait(&self) -> Result<()> {
        self.wait_on(&mut io::stdin().lock())
    }

    /// Like [`Pacing::wait`], reading manual advances from `input`
    ///
    /// # Errors
    ///
    /// Manual pacing fails once `input` is exhausted.
    pub fn wait_on<R: BufRead>(&self, input: &mut R) -> Result<()> {
        match self {
            Pacing::Manual => {
                print!("Press enter to advance program.");
                io::stdout().flush()?;
                let mut line = String::new();
                let read = input
                    .read_line(&mut line)
                    .wrap_err("Failed to read from stdin")?;
                if read == 0 {
                    return Err(eyre!("stdin closed, cannot advance program"));
                }
            }
            Pacing::Interval(interval) => sleep(*interval),
        }

        Ok(())
    }
}
