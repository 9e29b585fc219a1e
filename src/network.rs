//! Network Validation
//!
//! Compares the network a wallet reports against the network the session is
//! configured for, and builds / checks network switch requests.

use serde::{Deserialize, Serialize};

use crate::wallet::{NetworkType, WalletConnection, WalletError, WalletErrorKind};

/// Outcome of validating a connection's network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkValidation {
    pub is_valid: bool,
    pub current: NetworkType,
    pub expected: NetworkType,
    pub message: Option<String>,
}

/// Request to move a wallet to another network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSwitchRequest {
    pub from: NetworkType,
    pub to: NetworkType,
    pub reason: String,
}

/// Validates connections against an expected network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkValidator {
    expected: NetworkType,
    allow_auto_switch: bool,
}

impl NetworkValidator {
    pub fn new(expected: NetworkType, allow_auto_switch: bool) -> Self {
        Self {
            expected,
            allow_auto_switch,
        }
    }

    pub fn expected_network(&self) -> NetworkType {
        self.expected
    }

    pub fn allows_auto_switch(&self) -> bool {
        self.allow_auto_switch
    }

    pub fn validate(&self, connection: &WalletConnection) -> NetworkValidation {
        let is_valid = connection.network == self.expected;
        let message = (!is_valid).then(|| {
            format!(
                "Wallet is connected to {} but {} is required",
                connection.network.display_name(),
                self.expected.display_name()
            )
        });
        NetworkValidation {
            is_valid,
            current: connection.network,
            expected: self.expected,
            message,
        }
    }

    /// `WRONG_NETWORK` unless the connection is on the expected network
    pub fn require_expected(&self, connection: &WalletConnection) -> Result<(), WalletError> {
        let validation = self.validate(connection);
        match validation.message {
            None => Ok(()),
            Some(message) => Err(WalletError::new(WalletErrorKind::WrongNetwork, message)),
        }
    }

    /// Switch request from `current` to the expected network, `None` if already there
    pub fn build_switch_request(&self, current: NetworkType) -> Option<NetworkSwitchRequest> {
        if current == self.expected {
            return None;
        }
        Some(NetworkSwitchRequest {
            from: current,
            to: self.expected,
            reason: format!(
                "Switch from {} to {}",
                current.display_name(),
                self.expected.display_name()
            ),
        })
    }

    pub fn validate_switch_request(&self, request: &NetworkSwitchRequest) -> Result<(), WalletError> {
        if !self.allow_auto_switch {
            return Err(WalletError::new(
                WalletErrorKind::WrongNetwork,
                "Automatic network switching is disabled",
            ));
        }
        if request.from == request.to {
            return Err(WalletError::new(
                WalletErrorKind::WrongNetwork,
                format!("Already on {}", request.to.display_name()),
            ));
        }
        if request.to != self.expected {
            return Err(WalletError::new(
                WalletErrorKind::WrongNetwork,
                format!(
                    "Cannot switch to {}: only {} is supported",
                    request.to.display_name(),
                    self.expected.display_name()
                ),
            ));
        }
        Ok(())
    }

    /// Whether `network` names a known network
    pub fn is_supported(network: &str) -> bool {
        network.parse::<NetworkType>().is_ok()
    }

    pub fn display_name(network: NetworkType) -> &'static str {
        network.display_name()
    }
}

impl Default for NetworkValidator {
    fn default() -> Self {
        Self::new(NetworkType::Testnet, false)
    }
}
