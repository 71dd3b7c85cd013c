pub(crate) trait RegisterBits {
    fn mask() -> u8;
    fn value(&self) -> u8;
}

/// Over sampling ratio
///
/// Controls the bandwidth of the internal digital filter; a larger
/// ratio gives less in-band noise at higher power consumption.
#[derive(Copy, Clone, Debug)]
#[allow(non_camel_case_types)]
pub enum Oversampling {
    /// 512 samples
    _512 = 0x00,
    /// 256 samples
    _256 = 0x40,
    /// 128 samples
    _128 = 0x80,
    /// 64 samples
    _64 = 0xC0,
}

impl Default for Oversampling {
    fn default() -> Self {
        Oversampling::_128
    }
}

impl RegisterBits for Oversampling {
    fn mask() -> u8 {
        Oversampling::_64.value()
    }

    fn value(&self) -> u8 {
        *self as u8
    }
}

/// Magnetic field full scale
#[derive(Copy, Clone, Debug)]
#[allow(non_camel_case_types)]
pub enum FieldRange {
    /// +/- 2 gauss
    _2_Ga = 0x00,
    /// +/- 8 gauss
    _8_Ga = 0x10,
}

impl Default for FieldRange {
    fn default() -> Self {
        FieldRange::_2_Ga
    }
}

impl RegisterBits for FieldRange {
    fn mask() -> u8 {
        FieldRange::_8_Ga.value()
    }

    fn value(&self) -> u8 {
        *self as u8
    }
}

/// Output Data Rate
///
/// Rate at which the output registers refresh in continuous-measurement
/// mode.
#[derive(Copy, Clone, Debug)]
#[allow(non_camel_case_types)]
pub enum OutputDataRate {
    /// 10 Hz
    _10_Hz = 0x00,
    /// 50 Hz
    _50_Hz = 0x04,
    /// 100 Hz
    _100_Hz = 0x08,
    /// 200 Hz
    _200_Hz = 0x0C,
}

impl Default for OutputDataRate {
    fn default() -> Self {
        OutputDataRate::_100_Hz
    }
}

impl RegisterBits for OutputDataRate {
    fn mask() -> u8 {
        OutputDataRate::_200_Hz.value()
    }

    fn value(&self) -> u8 {
        *self as u8
    }
}

/// Operating mode
#[derive(Copy, Clone, Debug)]
pub enum Mode {
    /// Standby, output registers are not refreshed
    Standby = 0x00,
    /// Continuous measurement
    Continuous = 0x01,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Continuous
    }
}

impl RegisterBits for Mode {
    fn mask() -> u8 {
        Mode::Continuous.value()
    }

    fn value(&self) -> u8 {
        *self as u8
    }
}

/// Configuration of Qmc5883l
#[derive(Copy, Clone, Debug)]
pub struct QmcConfig {
    pub(crate) oversampling: Option<Oversampling>,
    pub(crate) field_range: Option<FieldRange>,
    pub(crate) output_data_rate: Option<OutputDataRate>,
    pub(crate) mode: Option<Mode>,
}

impl QmcConfig {
    /// Creates an empty Qmc5883l configuration; only the options set
    /// afterwards are written to the device.
    pub fn new() -> Self {
        QmcConfig { oversampling: None,
                    field_range: None,
                    output_data_rate: None,
                    mode: None, }
    }

    /// Sets the over sampling ratio ([`Oversampling`])
    ///
    /// [`Oversampling`]: ./enum.Oversampling.html
    pub fn oversampling(&mut self, oversampling: Oversampling) -> &mut Self {
        self.oversampling = Some(oversampling);
        self
    }

    /// Sets the magnetic field full scale ([`FieldRange`])
    ///
    /// [`FieldRange`]: ./enum.FieldRange.html
    pub fn field_range(&mut self, field_range: FieldRange) -> &mut Self {
        self.field_range = Some(field_range);
        self
    }

    /// Sets the output data rate ([`OutputDataRate`])
    ///
    /// [`OutputDataRate`]: ./enum.OutputDataRate.html
    pub fn output_data_rate(&mut self,
                            output_data_rate: OutputDataRate)
                            -> &mut Self {
        self.output_data_rate = Some(output_data_rate);
        self
    }

    /// Sets the operating mode ([`Mode`])
    ///
    /// [`Mode`]: ./enum.Mode.html
    pub fn mode(&mut self, mode: Mode) -> &mut Self {
        self.mode = Some(mode);
        self
    }
}
