//! A platform agnostic driver to interface with the QMC5883L (3-axis
//! magnetometer + thermometer)
//!
//! This driver was built using [`embedded-hal`] traits.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal

#![deny(missing_docs)]
#![deny(warnings)]
#![allow(unused)]
#![no_std]

extern crate cast;
extern crate embedded_hal as hal;
extern crate libm;
extern crate nalgebra;

#[cfg(test)]
#[macro_use]
extern crate std;
#[cfg(test)]
extern crate embedded_hal_mock;

mod conf;
mod reg;

use core::f32::consts::PI;

use cast::{f32, u16};

pub use nalgebra::Vector3;

use hal::blocking::i2c::{Write, WriteRead};

use conf::RegisterBits;
pub use conf::{FieldRange, Mode, OutputDataRate, Oversampling, QmcConfig};
use reg::Register;

// Temperature coefficient is about 100 LSB/C; the offset is not
// factory compensated, only relative values are accurate.
const TEMP_RESOLUTION: f32 = 0.01;

/// QMC5883L driver
pub struct Qmc5883l<I2C> {
    i2c: I2C,
}

/// QMC5883L driver error
#[derive(Debug, Copy, Clone)]
pub enum Error<E> {
    /// Underlying bus error.
    Bus(E),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Bus(e)
    }
}

impl<I2C, E> Qmc5883l<I2C> where I2C: WriteRead<Error = E> + Write<Error = E>
{
    /// Creates a new driver from a I2C peripheral and initializes the
    /// device: soft reset, then 128x over sampling on the +/-2 gauss
    /// range, refreshing continuously at 100 Hz.
    pub fn new(i2c: I2C) -> Result<Self, Error<E>> {
        let mut qmc5883l = Qmc5883l { i2c, };

        qmc5883l.soft_reset()?;
        qmc5883l.set_control_register(Oversampling::default(),
                                      FieldRange::default(),
                                      OutputDataRate::default(),
                                      Mode::default())?;

        Ok(qmc5883l)
    }

    /// Magnetometer measurements
    ///
    /// Reads all six output registers in one transaction; each axis is
    /// little-endian 16-bit and is stored as the two's-complement
    /// negation of the bus value.
    pub fn mag(&mut self) -> Result<Vector3<i16>, Error<E>> {
        let mut buffer = [0; 6];
        self.read_registers(Register::OUTX_L, &mut buffer)?;

        Ok(Vector3::new(decode_axis(buffer[0], buffer[1]),
                        decode_axis(buffer[2], buffer[3]),
                        decode_axis(buffer[4], buffer[5])))
    }

    /// Raw temperature sensor measurement
    ///
    /// The 16-bit container holds a logically signed value, negated the
    /// same way as the axis data.
    pub fn raw_temp(&mut self) -> Result<u16, Error<E>> {
        let mut buffer = [0; 2];
        self.read_registers(Register::TEMP_OUT_L, &mut buffer)?;
        let val = u16(buffer[0]) | (u16(buffer[1]) << 8);

        Ok((!val).wrapping_add(1))
    }

    /// Temperature sensor measurement in Celsius
    ///
    /// - Relative only: the sensor gain is factory calibrated but the
    ///   offset is not compensated
    pub fn temp(&mut self) -> Result<f32, Error<E>> {
        let rt = self.raw_temp()?;
        Ok(f32(rt as i16) * TEMP_RESOLUTION)
    }

    /// Chip identification register contents
    ///
    /// The QMC5883L answers `0xFF`.
    pub fn chip_id(&mut self) -> Result<u8, Error<E>> {
        self.read_register(Register::CHIP_ID)
    }

    /// Whether a new measurement is ready in the output registers
    pub fn data_ready(&mut self) -> Result<bool, Error<E>> {
        let status = self.read_register(Register::STATUS)?;
        Ok(status & reg::STATUS_DRDY != 0)
    }

    /// Whether the magnetic field saturated an axis during the last
    /// measurement
    pub fn overflow(&mut self) -> Result<bool, Error<E>> {
        let status = self.read_register(Register::STATUS)?;
        Ok(status & reg::STATUS_OVL != 0)
    }

    /// Resets the device
    ///
    /// Sets the soft reset bit of control register 2, then restores the
    /// recommended SET/RESET period. Control settings revert to their
    /// power-on values and the device stays in standby until
    /// reconfigured.
    pub fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.write_register(Register::CTRL2, reg::CTRL2_SOFT_RST)?;
        self.write_register(Register::SET_RESET_PERIOD,
                            reg::SET_RESET_PERIOD_RECOMMENDED)?;
        Ok(())
    }

    /// Programs control register 1 with the given option set
    ///
    /// The four option values are OR-ed into a single byte written in
    /// one transaction.
    pub fn set_control_register(&mut self,
                                oversampling: Oversampling,
                                field_range: FieldRange,
                                output_data_rate: OutputDataRate,
                                mode: Mode)
                                -> Result<(), Error<E>> {
        self.write_register(Register::CTRL1,
                            oversampling.value()
                            | field_range.value()
                            | output_data_rate.value()
                            | mode.value())
    }

    /// Sets the over sampling ratio ([`Oversampling`])
    ///
    /// [`Oversampling`]: ./enum.Oversampling.html
    pub fn set_oversampling(&mut self,
                            oversampling: Oversampling)
                            -> Result<(), Error<E>> {
        self.write_register_with_mask(Register::CTRL1, oversampling)
    }

    /// Sets the magnetic field full scale ([`FieldRange`])
    ///
    /// [`FieldRange`]: ./enum.FieldRange.html
    pub fn set_field_range(&mut self,
                           field_range: FieldRange)
                           -> Result<(), Error<E>> {
        self.write_register_with_mask(Register::CTRL1, field_range)
    }

    /// Sets the output data rate ([`OutputDataRate`])
    ///
    /// [`OutputDataRate`]: ./enum.OutputDataRate.html
    pub fn set_output_data_rate(&mut self,
                                output_data_rate: OutputDataRate)
                                -> Result<(), Error<E>> {
        self.write_register_with_mask(Register::CTRL1, output_data_rate)
    }

    /// Sets the operating mode ([`Mode`])
    ///
    /// [`Mode`]: ./enum.Mode.html
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error<E>> {
        self.write_register_with_mask(Register::CTRL1, mode)
    }

    /// Applies every option set in `config` ([`QmcConfig`])
    ///
    /// [`QmcConfig`]: ./struct.QmcConfig.html
    pub fn configure(&mut self, config: &QmcConfig) -> Result<(), Error<E>> {
        if let Some(oversampling) = config.oversampling {
            self.write_register_with_mask(Register::CTRL1, oversampling)?;
        }
        if let Some(field_range) = config.field_range {
            self.write_register_with_mask(Register::CTRL1, field_range)?;
        }
        if let Some(output_data_rate) = config.output_data_rate {
            self.write_register_with_mask(Register::CTRL1, output_data_rate)?;
        }
        if let Some(mode) = config.mode {
            self.write_register_with_mask(Register::CTRL1, mode)?;
        }
        Ok(())
    }

    /// Consumes the driver, releasing the underlying I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn modify_register<F>(&mut self,
                          reg: Register,
                          f: F)
                          -> Result<(), Error<E>>
        where F: FnOnce(u8) -> u8
    {
        let r = self.read_register(reg)?;
        self.write_register(reg, f(r))?;
        Ok(())
    }

    fn write_register_with_mask<RB>(&mut self,
                                    reg: Register,
                                    v: RB)
                                    -> Result<(), Error<E>>
        where RB: RegisterBits
    {
        self.modify_register(reg, |r| (r & !RB::mask()) | v.value())
    }

    fn read_register(&mut self, reg: Register) -> Result<u8, Error<E>> {
        let mut buffer = [0; 1];
        self.read_registers(reg, &mut buffer)?;
        Ok(buffer[0])
    }

    fn read_registers(&mut self,
                      reg: Register,
                      buffer: &mut [u8])
                      -> Result<(), Error<E>> {
        self.i2c.write_read(reg::ADDRESS, &[reg.addr()], buffer)?;
        Ok(())
    }

    fn write_register(&mut self, reg: Register, byte: u8) -> Result<(), Error<E>> {
        self.i2c.write(reg::ADDRESS, &[reg.addr(), byte])?;
        Ok(())
    }
}

/// Compass heading in degrees computed from a magnetometer reading
///
/// 0 = North, 90 = East, 180 = South, 270 = West, for a sensor whose
/// positive X axis points to magnetic north.
pub fn heading(mag: Vector3<i16>) -> i32 {
    // change sign to run clockwise
    let azimuth = -libm::atan2f(f32(mag.y), f32(mag.x)) * 180.0 / PI;
    // shift into positive range
    let ret = (azimuth + 180.0) as i32;
    360 - ret
}

// Each axis register pair holds 16 bits LSB first; the reading is the
// two's-complement negation of the bus value.
fn decode_axis(lsb: u8, msb: u8) -> i16 {
    let val = u16(lsb) | (u16(msb) << 8);
    (!val).wrapping_add(1) as i16
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use embedded_hal_mock::MockError;

    use super::*;

    const ADDR: u8 = 0x0D;

    fn init_transactions() -> std::vec::Vec<I2cTransaction> {
        vec![I2cTransaction::write(ADDR, vec![0x0A, 0x80]),
             I2cTransaction::write(ADDR, vec![0x0B, 0x01]),
             I2cTransaction::write(ADDR, vec![0x09, 0x89])]
    }

    fn initialized(extra: &[I2cTransaction]) -> Qmc5883l<I2cMock> {
        let mut expectations = init_transactions();
        expectations.extend_from_slice(extra);
        Qmc5883l::new(I2cMock::new(&expectations)).unwrap()
    }

    #[test]
    fn init_resets_then_programs_control_register() {
        let qmc = initialized(&[]);

        qmc.release().done();
    }

    #[test]
    fn mag_negates_raw_bus_values() {
        // X raw 100, Y raw 65436 (-100 on the bus), Z raw 0
        let read = I2cTransaction::write_read(ADDR,
                                              vec![0x00],
                                              vec![0x64, 0x00, 0x9C, 0xFF,
                                                   0x00, 0x00]);
        let mut qmc = initialized(&[read]);

        assert_eq!(qmc.mag().unwrap(), Vector3::new(-100, 100, 0));

        qmc.release().done();
    }

    #[test]
    fn mag_truncates_to_16_bits() {
        // X raw 40000 negates to 25536 after truncation
        let read = I2cTransaction::write_read(ADDR,
                                              vec![0x00],
                                              vec![0x40, 0x9C, 0x00, 0x00,
                                                   0x00, 0x00]);
        let mut qmc = initialized(&[read]);

        assert_eq!(qmc.mag().unwrap(), Vector3::new(25536, 0, 0));

        qmc.release().done();
    }

    #[test]
    fn raw_temp_negates_bus_value() {
        let read = I2cTransaction::write_read(ADDR,
                                              vec![0x07],
                                              vec![0x10, 0x00]);
        let mut qmc = initialized(&[read]);

        assert_eq!(qmc.raw_temp().unwrap(), 65520);

        qmc.release().done();
    }

    #[test]
    fn temp_converts_at_100_lsb_per_degree() {
        // raw 65336 negates to 200 LSB, i.e. 2 C relative
        let read = I2cTransaction::write_read(ADDR,
                                              vec![0x07],
                                              vec![0x38, 0xFF]);
        let mut qmc = initialized(&[read]);

        let t = qmc.temp().unwrap();
        assert!((t - 2.0).abs() < 1e-4);

        qmc.release().done();
    }

    #[test]
    fn chip_id_reads_identification_register() {
        let read = I2cTransaction::write_read(ADDR, vec![0x0D], vec![0xFF]);
        let mut qmc = initialized(&[read]);

        assert_eq!(qmc.chip_id().unwrap(), 0xFF);

        qmc.release().done();
    }

    #[test]
    fn status_bits() {
        let reads = [I2cTransaction::write_read(ADDR, vec![0x06], vec![0x01]),
                     I2cTransaction::write_read(ADDR, vec![0x06], vec![0x02])];
        let mut qmc = initialized(&reads);

        assert!(qmc.data_ready().unwrap());
        assert!(qmc.overflow().unwrap());

        qmc.release().done();
    }

    #[test]
    fn default_control_byte_is_0x89() {
        assert_eq!(Oversampling::default() as u8
                   | FieldRange::default() as u8
                   | OutputDataRate::default() as u8
                   | Mode::default() as u8,
                   0x89);
    }

    #[test]
    fn set_control_register_composes_one_byte() {
        let write = I2cTransaction::write(ADDR, vec![0x09, 0x1C]);
        let mut qmc = initialized(&[write]);

        qmc.set_control_register(Oversampling::_512,
                                 FieldRange::_8_Ga,
                                 OutputDataRate::_200_Hz,
                                 Mode::Standby)
           .unwrap();

        qmc.release().done();
    }

    #[test]
    fn setters_modify_only_their_field() {
        let rmw = [I2cTransaction::write_read(ADDR, vec![0x09], vec![0x89]),
                   I2cTransaction::write(ADDR, vec![0x09, 0x99]),
                   I2cTransaction::write_read(ADDR, vec![0x09], vec![0x99]),
                   I2cTransaction::write(ADDR, vec![0x09, 0x9D])];
        let mut qmc = initialized(&rmw);

        qmc.set_field_range(FieldRange::_8_Ga).unwrap();
        qmc.set_output_data_rate(OutputDataRate::_200_Hz).unwrap();

        qmc.release().done();
    }

    #[test]
    fn configure_applies_only_set_options() {
        let rmw = [I2cTransaction::write_read(ADDR, vec![0x09], vec![0x89]),
                   I2cTransaction::write(ADDR, vec![0x09, 0x8D])];
        let mut qmc = initialized(&rmw);

        let mut config = QmcConfig::new();
        config.output_data_rate(OutputDataRate::_200_Hz);
        qmc.configure(&config).unwrap();

        qmc.release().done();
    }

    #[test]
    fn bus_error_is_surfaced() {
        let failed = I2cTransaction::write_read(ADDR,
                                                vec![0x00],
                                                vec![0x00, 0x00, 0x00, 0x00,
                                                     0x00, 0x00])
            .with_error(MockError::Io(std::io::ErrorKind::Other));
        let mut qmc = initialized(&[failed]);

        match qmc.mag() {
            Err(Error::Bus(_)) => (),
            other => panic!("expected bus error, got {:?}", other),
        }

        qmc.release().done();
    }

    #[test]
    fn heading_of_north_aligned_reading() {
        assert_eq!(heading(Vector3::new(1, 0, 0)), 180);
    }

    #[test]
    fn heading_of_east_aligned_reading() {
        assert_eq!(heading(Vector3::new(0, 1, 0)), 270);
    }

    #[test]
    fn heading_of_remaining_quadrants() {
        assert_eq!(heading(Vector3::new(0, -1, 0)), 90);
        assert_eq!(heading(Vector3::new(-1, 0, 0)), 360);
        assert_eq!(heading(Vector3::new(1, 1, 0)), 225);
    }

    #[test]
    fn decode_axis_is_twos_complement_negation() {
        assert_eq!(decode_axis(0x00, 0x00), 0);
        assert_eq!(decode_axis(0x01, 0x00), -1);
        assert_eq!(decode_axis(0xFF, 0x7F), -32767);
        assert_eq!(decode_axis(0x00, 0x80), -32768);
        assert_eq!(decode_axis(0x40, 0x9C), 25536);
    }
}
