use crate::device::{ConfigAttrib, ConfigAttribs, ConfigDesc, ConfigId, Driver};

use super::CapabilityRequest;

/// Floor used for the driver query; acceptance still requires exact sizes.
pub const MINIMUM_COLOR_CHANNEL_SIZE: u32 = 4;

/// Multisample levels tried before the single-sample fallback, best first.
pub const MULTISAMPLE_LEVELS: [u32; 2] = [4, 2];

/// Picks one configuration for a `CapabilityRequest`.
///
/// Query order:
/// 1. each of `MULTISAMPLE_LEVELS`, stopping at the first non-empty answer
/// 2. the same query without multisample attributes
///
/// From the winning answer the first configuration, in driver order, that
/// `CapabilityRequest::accepts` is chosen. No re-sorting happens here.
#[derive(Debug, Copy, Clone)]
pub struct ConfigChooser {
    request: CapabilityRequest,
}

impl ConfigChooser {
    pub fn new(request: CapabilityRequest) -> Self {
        Self { request }
    }

    pub fn choose(&self, driver: &dyn Driver) -> Option<ConfigId> {
        let base = ConfigAttribs::with_channel_floor(MINIMUM_COLOR_CHANNEL_SIZE);

        let candidates = MULTISAMPLE_LEVELS
            .iter()
            .find_map(|&samples| {
                let found = driver.choose_configs(&base.with_samples(samples));
                if found.is_empty() {
                    log::debug!("no configurations with {samples}x multisampling");
                    None
                } else {
                    log::debug!("{} configurations with {samples}x multisampling", found.len());
                    Some(found)
                }
            })
            .or_else(|| {
                let found = driver.choose_configs(&base);
                log::debug!("{} configurations without multisampling", found.len());
                (!found.is_empty()).then_some(found)
            });

        let Some(candidates) = candidates else {
            log::warn!("driver advertises no usable configuration");
            return None;
        };

        let chosen = candidates
            .into_iter()
            .find(|&config| self.accepts(driver, config));
        match chosen {
            Some(config) => log::info!("chose configuration {config:?} for {:?}", self.request),
            None => log::warn!("no configuration matches {:?}", self.request),
        }
        chosen
    }

    fn accepts(&self, driver: &dyn Driver, config: ConfigId) -> bool {
        describe(driver, config).is_some_and(|desc| self.request.accepts(&desc))
    }
}

/// Reads a configuration's attributes back from the driver.
pub fn describe(driver: &dyn Driver, config: ConfigId) -> Option<ConfigDesc> {
    let get = |attrib| driver.config_attrib(config, attrib);
    Some(ConfigDesc {
        red: get(ConfigAttrib::RedSize)?,
        green: get(ConfigAttrib::GreenSize)?,
        blue: get(ConfigAttrib::BlueSize)?,
        alpha: get(ConfigAttrib::AlphaSize)?,
        depth: get(ConfigAttrib::DepthSize)?,
        stencil: get(ConfigAttrib::StencilSize)?,
        samples: get(ConfigAttrib::Samples)?,
        // Only programmable configurations are ever queried.
        programmable: true,
    })
}
