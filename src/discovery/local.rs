use super::{LocatorError, ServiceLocator};
use crate::domain::BodyPart;

pub(crate) const STRATEGY: &str = "local";

/// Port offsets of co-located peers relative to the monolith's own port.
const PORT_OFFSETS: [(BodyPart, u16); 5] = [
    (BodyPart::Hat, 1),
    (BodyPart::LeftLeg, 2),
    (BodyPart::LeftArm, 3),
    (BodyPart::RightLeg, 4),
    (BodyPart::RightArm, 5),
];

#[derive(Clone, Debug)]
pub struct LocalLocator {
    host: String,
    port: u16,
}

impl LocalLocator {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, LocatorError> {
        let max_offset = Self::max_offset();
        if port.checked_add(max_offset).is_none() {
            return Err(LocatorError::PortOverflow {
                port,
                offset: max_offset,
            });
        }
        Ok(Self {
            host: host.into(),
            port,
        })
    }

    pub fn max_offset() -> u16 {
        PORT_OFFSETS
            .iter()
            .map(|(_, offset)| *offset)
            .max()
            .unwrap_or(0)
    }

    pub fn offset_of(part: BodyPart) -> u16 {
        PORT_OFFSETS
            .iter()
            .find(|(candidate, _)| *candidate == part)
            .map(|(_, offset)| *offset)
            .unwrap_or(0)
    }

    pub fn port_for(&self, part: BodyPart) -> u16 {
        // new() guarantees the sum fits
        self.port + Self::offset_of(part)
    }
}

impl ServiceLocator for LocalLocator {
    fn resolve(&self, service: &str) -> Result<String, LocatorError> {
        let part = BodyPart::from_name(service).ok_or_else(|| LocatorError::UnknownService {
            service: service.to_string(),
        })?;
        Ok(format!("http://{}:{}", self.host, self.port_for(part)))
    }

    fn strategy(&self) -> &'static str {
        STRATEGY
    }
}
