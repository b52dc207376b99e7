/// ESP-IDF promiscuous-mode binding of the capture engine's `Radio` trait.
///
/// The WiFi driver invokes a bare C callback with no user pointer, so the
/// registered `FrameHandler` lives in a static slot. The callback runs in
/// the WiFi driver task: it only `try_lock`s the slot and calls the handler
/// through the guard, so the last reference is never dropped in the
/// driver task.

use std::sync::{Arc, Mutex};

use esp_idf_svc::sys::{
    esp, esp_wifi_set_channel, esp_wifi_set_promiscuous, esp_wifi_set_promiscuous_filter,
    esp_wifi_set_promiscuous_rx_cb, wifi_promiscuous_filter_t, wifi_promiscuous_pkt_t,
    wifi_promiscuous_pkt_type_t, wifi_second_chan_t, wifi_second_chan_t_WIFI_SECOND_CHAN_ABOVE,
    wifi_second_chan_t_WIFI_SECOND_CHAN_BELOW, wifi_second_chan_t_WIFI_SECOND_CHAN_NONE,
    EspError,
};
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use macsniff::config::{FilterMask, SecondaryChannel};
use macsniff::frame::RxControl;
use macsniff::radio::{FrameHandler, Radio, RadioError};

static HANDLER: Mutex<Option<Arc<dyn FrameHandler>>> = Mutex::new(None);

/// WiFi promiscuous mode callback.
///
/// Runs in the WiFi driver task context (not ISR on ESP-IDF, but still
/// must be non-blocking). Frames arriving while the slot is being swapped
/// are dropped.
unsafe extern "C" fn promisc_rx_cb(
    buf: *mut std::ffi::c_void,
    _pkt_type: wifi_promiscuous_pkt_type_t,
) {
    let Ok(slot) = HANDLER.try_lock() else {
        return;
    };
    let Some(handler) = slot.as_ref() else {
        return;
    };

    let pkt = unsafe { &*(buf as *const wifi_promiscuous_pkt_t) };
    let rx = RxControl {
        rssi: pkt.rx_ctrl.rssi() as i8,
        channel: pkt.rx_ctrl.channel() as u8,
        cwb: pkt.rx_ctrl.cwb() as u8,
        timestamp: pkt.rx_ctrl.timestamp() as u32,
        sig_len: pkt.rx_ctrl.sig_len() as u16,
    };

    // Safety: the driver guarantees `sig_len` bytes at pkt.payload
    let data = unsafe { std::slice::from_raw_parts(pkt.payload.as_ptr(), rx.sig_len as usize) };
    handler.on_frame(rx, data);
}

fn driver_error(e: EspError) -> RadioError {
    RadioError::Driver(e.code())
}

fn second_chan(secondary: SecondaryChannel) -> wifi_second_chan_t {
    match secondary {
        SecondaryChannel::None => wifi_second_chan_t_WIFI_SECOND_CHAN_NONE,
        SecondaryChannel::Above => wifi_second_chan_t_WIFI_SECOND_CHAN_ABOVE,
        SecondaryChannel::Below => wifi_second_chan_t_WIFI_SECOND_CHAN_BELOW,
    }
}

pub struct EspRadio {
    wifi: Mutex<BlockingWifi<EspWifi<'static>>>,
}

impl EspRadio {
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self {
            wifi: Mutex::new(wifi),
        }
    }

    fn ensure_started(&self) -> Result<(), RadioError> {
        let wifi = self.wifi.lock().map_err(|_| RadioError::NotInitialized)?;
        match wifi.is_started() {
            Ok(true) => Ok(()),
            Ok(false) => Err(RadioError::NotInitialized),
            Err(e) => Err(driver_error(e)),
        }
    }
}

impl Radio for EspRadio {
    fn init(&self) -> Result<(), RadioError> {
        let mut wifi = self.wifi.lock().map_err(|_| RadioError::NotInitialized)?;
        // Station mode without a network: the radio listens, never associates
        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))
            .map_err(driver_error)?;
        wifi.start().map_err(driver_error)?;
        log::info!("WiFi driver started");
        Ok(())
    }

    fn set_promiscuous(
        &self,
        enabled: bool,
        handler: Option<Arc<dyn FrameHandler>>,
    ) -> Result<(), RadioError> {
        self.ensure_started()?;
        if enabled {
            if let Ok(mut slot) = HANDLER.lock() {
                *slot = handler;
            }
            unsafe {
                esp!(esp_wifi_set_promiscuous_rx_cb(Some(promisc_rx_cb))).map_err(driver_error)?;
                esp!(esp_wifi_set_promiscuous(true)).map_err(driver_error)?;
            }
            log::info!("Promiscuous mode enabled");
        } else {
            let result = unsafe { esp!(esp_wifi_set_promiscuous(false)) };
            if let Ok(mut slot) = HANDLER.lock() {
                *slot = None;
            }
            result.map_err(driver_error)?;
            log::info!("Promiscuous mode disabled");
        }
        Ok(())
    }

    fn set_channel(&self, channel: u8, secondary: SecondaryChannel) -> Result<(), RadioError> {
        unsafe { esp!(esp_wifi_set_channel(channel, second_chan(secondary))) }.map_err(driver_error)
    }

    fn set_frame_filter(&self, mask: FilterMask) -> Result<(), RadioError> {
        let filter = wifi_promiscuous_filter_t {
            filter_mask: mask.bits(),
        };
        unsafe { esp!(esp_wifi_set_promiscuous_filter(&filter)) }.map_err(driver_error)
    }

    fn stop(&self) -> Result<(), RadioError> {
        self.set_promiscuous(false, None)
    }
}
