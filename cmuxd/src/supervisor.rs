//! Daemon lifecycle
//!
//! A [`Supervisor`] is only ever built from a fully brought-up link: the
//! modem is in CMUX mode, n_gsm owns the line and the channel nodes exist.
//! It holds the serial line open for as long as the multiplexer should
//! live, and tears everything down in the right order on shutdown.

use cmux_link::{
    activate, discover_major, switch_to_cmux, AtChannel, DeviceNodes, LinkError, MuxDriver,
    NodeBackend, Pacer,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::config::BringUpConfig;
use crate::shutdown::ShutdownToken;

/// Owner of the multiplexed line and its device nodes
///
/// Fields drop in declaration order, so nodes are removed before the line
/// is closed even when the supervisor is dropped without [`shutdown`].
///
/// [`shutdown`]: Supervisor::shutdown
#[derive(Debug)]
pub struct Supervisor<S, B: NodeBackend> {
    nodes: Option<DeviceNodes<B>>,
    line: S,
}

impl<S, B> Supervisor<S, B>
where
    S: AsyncRead + AsyncWrite + Unpin,
    B: NodeBackend,
{
    /// Run the whole bring-up on an already configured `line`
    ///
    /// Any error leaves no nodes behind; the line is closed when it drops.
    pub async fn bring_up<D, P>(
        config: &BringUpConfig,
        mut line: S,
        driver: &mut D,
        backend: B,
        pacer: &P,
    ) -> Result<Self, LinkError>
    where
        D: MuxDriver,
        P: Pacer,
    {
        let plan = config.plan();
        let report = {
            let mut channel = AtChannel::new(&mut line, pacer);
            switch_to_cmux(&mut channel, &plan).await?
        };
        debug!(
            "{} modem in CMUX mode, {} advisory step(s) rejected",
            report.profile,
            report.rejected_advisories().count()
        );

        let params = activate(driver, config.mtu)?;
        debug!("Multiplexer running with MTU {}", params.mtu);

        let nodes = if config.node_count > 0 {
            let major = discover_major(&config.registry, &config.driver)?;
            let nodes = DeviceNodes::create(backend, major, config.node_layout());
            if nodes.created() < nodes.requested() {
                warn!(
                    "Cannot create all nodes, only {}/{} have been created.",
                    nodes.created(),
                    nodes.requested()
                );
            }
            Some(nodes)
        } else {
            None
        };

        Ok(Self { nodes, line })
    }
}

impl<S, B: NodeBackend> Supervisor<S, B> {
    pub fn nodes(&self) -> Option<&DeviceNodes<B>> {
        self.nodes.as_ref()
    }

    /// Keep the line open until `token` fires
    pub async fn park(&self, token: &mut ShutdownToken) {
        if token.is_triggered() {
            return;
        }
        info!("Multiplexer up, waiting for termination");
        token.wait().await;
    }

    /// Remove the nodes, then close the line
    pub fn shutdown(mut self) {
        if let Some(mut nodes) = self.nodes.take() {
            nodes.remove();
        }
        drop(self.line);
        info!("Line closed");
    }
}
