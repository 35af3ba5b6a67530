//! Event kinds, contexts, and the built-in catalog.
//!
//! A kind is identified by its name. Its position in the taxonomy and its
//! context are recorded on a [`KindDescriptor`], which is only ever created
//! by the built-in catalog or by [`Taxonomy::register_kind`](crate::Taxonomy::register_kind).

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of an event kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventKind(Cow<'static, str>);

impl EventKind {
    /// Create a kind name from a static string.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a kind name from an owned string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The kind name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventKind {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl AsRef<EventKind> for EventKind {
    fn as_ref(&self) -> &EventKind {
        self
    }
}

/// Coarse category every kind below a context root belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventContext {
    /// Generated by the controller or core applications.
    Core,
    /// Protocol messages, inbound or outbound.
    Message,
    /// Generated to or by applications, not protocol messages.
    Apps,
}

impl EventContext {
    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Message => "message",
            Self::Apps => "apps",
        }
    }
}

impl fmt::Display for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Taxonomy entry for a kind: its name, parent, and context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindDescriptor {
    kind: EventKind,
    parent: Option<EventKind>,
    context: Option<EventContext>,
}

impl KindDescriptor {
    const fn builtin(
        name: &'static str,
        parent: Option<&'static str>,
        context: Option<EventContext>,
    ) -> Self {
        let parent = match parent {
            Some(p) => Some(EventKind::from_static(p)),
            None => None,
        };
        Self {
            kind: EventKind::from_static(name),
            parent,
            context,
        }
    }

    pub(crate) fn extension(
        kind: EventKind,
        parent: EventKind,
        context: Option<EventContext>,
    ) -> Self {
        Self {
            kind,
            parent: Some(parent),
            context,
        }
    }

    /// The kind this descriptor describes.
    #[must_use]
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// The parent kind, `None` only for the universal root.
    #[must_use]
    pub fn parent(&self) -> Option<&EventKind> {
        self.parent.as_ref()
    }

    /// The context events of this kind carry.
    #[must_use]
    pub fn context(&self) -> Option<EventContext> {
        self.context
    }
}

impl AsRef<EventKind> for KindDescriptor {
    fn as_ref(&self) -> &EventKind {
        &self.kind
    }
}

/// The built-in kind catalog.
pub mod kinds {
    use super::{EventContext, KindDescriptor};

    const CORE: Option<EventContext> = Some(EventContext::Core);
    const MESSAGE: Option<EventContext> = Some(EventContext::Message);
    const APPS: Option<EventContext> = Some(EventContext::Apps);

    /// Universal root: every event is an `Event`.
    pub const ANY_EVENT: KindDescriptor = KindDescriptor::builtin("Event", None, None);

    // ========== Roots ==========
    /// Context root for controller and core application events.
    pub const CORE_EVENT: KindDescriptor = KindDescriptor::builtin("CoreEvent", Some("Event"), CORE);
    /// Context root for protocol message events.
    pub const MESSAGE_EVENT: KindDescriptor =
        KindDescriptor::builtin("MessageEvent", Some("Event"), MESSAGE);
    /// Context root for application events.
    pub const APP_EVENT: KindDescriptor = KindDescriptor::builtin("AppEvent", Some("Event"), APPS);
    /// Controller teardown signal.
    pub const SHUTDOWN_EVENT: KindDescriptor =
        KindDescriptor::builtin("ShutdownEvent", Some("Event"), None);

    // ========== Core ==========
    /// Raw occurrence from the network, handled into a more specific event.
    pub const RAW_EVENT: KindDescriptor = KindDescriptor::builtin("RawEvent", Some("CoreEvent"), CORE);
    /// A new connection was established.
    pub const NEW_CONNECTION: KindDescriptor =
        KindDescriptor::builtin("NewConnection", Some("RawEvent"), CORE);
    /// A connection was lost.
    pub const CONNECTION_LOST: KindDescriptor =
        KindDescriptor::builtin("ConnectionLost", Some("RawEvent"), CORE);
    /// An OpenFlow message arrived; header decoded, body still packed.
    pub const RAW_OPENFLOW_MESSAGE: KindDescriptor =
        KindDescriptor::builtin("RawOpenFlowMessage", Some("RawEvent"), CORE);
    /// A switch connection was established.
    pub const SWITCH_UP: KindDescriptor = KindDescriptor::builtin("SwitchUp", Some("CoreEvent"), CORE);
    /// A switch connection was lost.
    pub const SWITCH_DOWN: KindDescriptor =
        KindDescriptor::builtin("SwitchDown", Some("CoreEvent"), CORE);
    /// An application was installed.
    pub const APP_INSTALLED: KindDescriptor =
        KindDescriptor::builtin("AppInstalled", Some("CoreEvent"), CORE);
    /// An application was loaded.
    pub const APP_LOADED: KindDescriptor = KindDescriptor::builtin("AppLoaded", Some("CoreEvent"), CORE);
    /// An application was uninstalled.
    pub const APP_UNINSTALLED: KindDescriptor =
        KindDescriptor::builtin("AppUninstalled", Some("CoreEvent"), CORE);
    /// An application was unloaded.
    pub const APP_UNLOADED: KindDescriptor =
        KindDescriptor::builtin("AppUnloaded", Some("CoreEvent"), CORE);
    /// The controller's listening server went down.
    pub const SERVER_DOWN: KindDescriptor = KindDescriptor::builtin("ServerDown", Some("CoreEvent"), CORE);

    // ========== Messages ==========
    /// Inbound protocol message.
    pub const MESSAGE_IN: KindDescriptor =
        KindDescriptor::builtin("MessageIn", Some("MessageEvent"), MESSAGE);
    /// Outbound protocol message.
    pub const MESSAGE_OUT: KindDescriptor =
        KindDescriptor::builtin("MessageOut", Some("MessageEvent"), MESSAGE);
    /// Inbound Hello.
    pub const MESSAGE_IN_HELLO: KindDescriptor =
        KindDescriptor::builtin("MessageInHello", Some("MessageIn"), MESSAGE);
    /// Inbound Echo Request.
    pub const MESSAGE_IN_ECHO_REQUEST: KindDescriptor =
        KindDescriptor::builtin("MessageInEchoRequest", Some("MessageIn"), MESSAGE);
    /// Outbound Hello.
    pub const MESSAGE_OUT_HELLO: KindDescriptor =
        KindDescriptor::builtin("MessageOutHello", Some("MessageOut"), MESSAGE);
    /// Outbound Echo Reply.
    pub const MESSAGE_OUT_ECHO_REPLY: KindDescriptor =
        KindDescriptor::builtin("MessageOutEchoReply", Some("MessageOut"), MESSAGE);
    /// Outbound Features Request.
    pub const MESSAGE_OUT_FEATURES_REQUEST: KindDescriptor =
        KindDescriptor::builtin("MessageOutFeaturesRequest", Some("MessageOut"), MESSAGE);
    /// Outbound Set Config.
    pub const MESSAGE_OUT_SET_CONFIG: KindDescriptor =
        KindDescriptor::builtin("MessageOutSetConfig", Some("MessageOut"), MESSAGE);

    /// Every built-in kind, parents before children.
    #[must_use]
    pub fn catalog() -> Vec<KindDescriptor> {
        vec![
            ANY_EVENT,
            CORE_EVENT,
            MESSAGE_EVENT,
            APP_EVENT,
            SHUTDOWN_EVENT,
            RAW_EVENT,
            NEW_CONNECTION,
            CONNECTION_LOST,
            RAW_OPENFLOW_MESSAGE,
            SWITCH_UP,
            SWITCH_DOWN,
            APP_INSTALLED,
            APP_LOADED,
            APP_UNINSTALLED,
            APP_UNLOADED,
            SERVER_DOWN,
            MESSAGE_IN,
            MESSAGE_OUT,
            MESSAGE_IN_HELLO,
            MESSAGE_IN_ECHO_REQUEST,
            MESSAGE_OUT_HELLO,
            MESSAGE_OUT_ECHO_REPLY,
            MESSAGE_OUT_FEATURES_REQUEST,
            MESSAGE_OUT_SET_CONFIG,
        ]
    }
}
