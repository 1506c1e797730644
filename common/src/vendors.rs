use std::sync::OnceLock;

use mac_oui::Oui;
use pnet::util::MacAddr;

use crate::debug;

/// Resolves a MAC address to the name of the company that owns its OUI.
pub trait VendorRepository: Send + Sync {
    fn get_vendor(&self, mac: MacAddr) -> Option<String>;
}

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

/// Retrieves or initializes the **Organizationally unique identifier** database.
///
/// A database that fails to load only disables the lookup.
fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                debug!("OUI database unavailable: {e:?}");
                None
            }
        })
        .as_ref()
}

/// Vendor lookup backed by the embedded OUI database.
pub struct OuiVendors;

impl VendorRepository for OuiVendors {
    fn get_vendor(&self, mac: MacAddr) -> Option<String> {
        let db = get_oui_db()?;
        match db.lookup_by_mac(&mac.to_string()) {
            Ok(Some(entry)) => Some(entry.company_name.clone()),
            _ => None,
        }
    }
}
