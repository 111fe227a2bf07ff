use doorbell_core::config::{NetworkConfig, StaticAddress};
use doorbell_core::hal::LinkControl;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::ipv4;
use esp_idf_svc::netif::{EspNetif, NetifConfiguration};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};
use log::debug;

use super::BoardError;

/// Station-mode Wi-Fi with a fixed address.
///
/// Association is started by `reconnect` and never awaited.
pub struct WifiLink {
    wifi: EspWifi<'static>,
}

impl WifiLink {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        network: &NetworkConfig,
    ) -> Result<Self, BoardError> {
        let mut wifi = EspWifi::new(modem, sysloop, Some(nvs))?;
        let auth_method = if network.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: network
                .ssid
                .try_into()
                .map_err(|()| BoardError::CredentialsTooLong)?,
            password: network
                .password
                .try_into()
                .map_err(|()| BoardError::CredentialsTooLong)?,
            auth_method,
            ..Default::default()
        }))?;
        Ok(Self { wifi })
    }
}

impl LinkControl for WifiLink {
    type Error = EspError;

    fn apply_static_address(&mut self, address: &StaticAddress) -> Result<(), EspError> {
        let netif = EspNetif::new_with_conf(&NetifConfiguration {
            ip_configuration: Some(ipv4::Configuration::Client(
                ipv4::ClientConfiguration::Fixed(ipv4::ClientSettings {
                    ip: address.ip,
                    subnet: ipv4::Subnet {
                        gateway: address.gateway,
                        mask: ipv4::Mask(address.prefix_len()),
                    },
                    dns: Some(address.dns),
                    secondary_dns: None,
                }),
            )),
            ..NetifConfiguration::wifi_default_client()
        })?;
        // The default DHCP netif is dropped here.
        self.wifi.swap_netif_sta(netif)?;
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn reconnect(&mut self) -> Result<(), EspError> {
        if !self.wifi.is_started()? {
            debug!("starting wifi driver");
            self.wifi.start()?;
        }
        self.wifi.connect()
    }
}
