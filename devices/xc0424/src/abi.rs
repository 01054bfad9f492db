//! Command payload builders. Each function returns the raw payload (opcode
//! plus arguments) that [`crate::frame::encode`] wraps for the wire.

use crate::bcd::PackedDecimal;
use crate::config::ConfigRegister;
use crate::schedule::ScheduleBytes;

pub trait Arg {
    const SIZE: usize;
    fn to_bytes(&self) -> Vec<u8>;
}

impl Arg for u8 {
    const SIZE: usize = 1;
    fn to_bytes(&self) -> Vec<u8> {
        vec![*self]
    }
}

impl Arg for u16 {
    const SIZE: usize = 2;
    fn to_bytes(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
}

macro_rules! impl_command_abi {
    [$(
        $( #[doc = $( $doc:tt )* ] )*
        fn $name:ident ( $([ $( $hardcode:expr ),* ]$(,)?)? $( $arg:ident: $type:tt ),* );
    )+] => {
        $(
            $(#[doc = concat!("Construct a payload for ", $($doc)*)])*
            #[allow(unused_mut)]
            pub fn $name( $( $arg: $type ),* ) -> Vec<u8> {
                let len = const { 0 $($( + $hardcode - $hardcode + 1 )*)? $( + $type::SIZE )* };
                let mut buf = Vec::with_capacity(len);
                $($(
                    buf.push($hardcode);
                )*)?
                $(
                    buf.extend_from_slice(&$arg.to_bytes());
                )*
                debug_assert_eq!(buf.len(), len);
                buf
            }
        )*
    };
}

impl_command_abi![
    /* GETTER COMMANDS */

    /// reading `len` bytes of device memory starting at `address`
    fn read_memory([0x01, 0x00], address: u16, len: u8);

    /// reading the live humidity and temperature
    fn read_current([0x01, 0x01, 0x02]);

    /* SETTER COMMANDS */

    /// setting the device clock
    fn set_clock(
        [0x00, 0x11],
        year: PackedDecimal,
        month: PackedDecimal,
        day: PackedDecimal,
        hour: PackedDecimal,
        minute: PackedDecimal,
        second: PackedDecimal
    );

    /// writing the configuration register, interval and calibration offsets
    fn write_config(
        [0x00, 0x22],
        register: ConfigRegister,
        interval: u16,
        temperature_offset: u16,
        humidity_offset: u8
    );

    /// writing the four segmented recording windows
    fn write_schedule([0x00, 0x04], slots: ScheduleBytes);

    /// erasing all stored history
    fn clear_history([0x00, 0x08]);
];
