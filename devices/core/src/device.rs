//! Static device identification.

/// Static information about a logger model for detection and CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: &'static str,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceInfo {
    /// Check if a HID device matches this model
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}
