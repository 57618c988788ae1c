use std::collections::BTreeMap;
use std::rc::Rc;

use extlink_live::{LiveDataError, LiveDataEvent, LiveDataRef};
use extlink_protocol::{
    AUTO_TOKEN, CommandRequest, CommandResponse, ComponentChange, ComponentResponse, Envelope,
    EventMessage, LiveDataOperation, LiveDataUpdate, Method, RegisterRequest, RegisterSuccess,
    ResourceState, parse_message,
};
use extlink_schema::{Environment, ExtensionSchema, SchemaReader, SchemaWarning};
use serde_json::Value;
use uuid::Uuid;

use crate::correlation::CorrelationTable;
use crate::dispatch::EventDispatcher;
use crate::{
    ActionRef, ClientConfig, ClientError, ExtensionComponent, ExtensionDocument, ExtensionEvent,
    ExtensionServices, RegistrationState,
};

/// A document's request to run an extension command.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandInvocation {
    pub uri: String,
    pub name: String,
    pub payload: Value,
    /// Component handle the command targets; must be a string when present.
    pub resource_id: Option<Value>,
}

impl CommandInvocation {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            payload: Value::Null,
            resource_id: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<Value>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }
}

/// Protocol state for one extension connection.
pub struct ExtensionClient {
    uri: String,
    config: ClientConfig,
    services: ExtensionServices,
    state: RegistrationState,
    token: String,
    schema: ExtensionSchema,
    warnings: Vec<SchemaWarning>,
    live_data: BTreeMap<String, LiveDataRef>,
    actions: CorrelationTable,
    dispatcher: EventDispatcher,
}

impl ExtensionClient {
    pub fn new(uri: impl Into<String>, config: ClientConfig, services: ExtensionServices) -> Self {
        let uri = uri.into();
        Self {
            schema: ExtensionSchema::empty(uri.clone()),
            uri,
            config,
            services,
            state: RegistrationState::default(),
            token: String::new(),
            warnings: Vec::new(),
            live_data: BTreeMap::new(),
            actions: CorrelationTable::default(),
            dispatcher: EventDispatcher::default(),
        }
    }

    /// Canonical URI; replaced by the schema's URI once registered.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn registration_state(&self) -> RegistrationState {
        self.state
    }

    pub fn registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }

    pub fn registration_message_processed(&self) -> bool {
        self.state.is_processed()
    }

    pub fn registration_failed(&self) -> bool {
        self.state == RegistrationState::Failed
    }

    /// Empty until registration succeeds.
    pub fn connection_token(&self) -> &str {
        &self.token
    }

    pub fn schema(&self) -> &ExtensionSchema {
        &self.schema
    }

    /// Entries skipped while reading the registration schema.
    pub fn schema_warnings(&self) -> &[SchemaWarning] {
        &self.warnings
    }

    pub fn environment(&self) -> Value {
        self.schema.environment.to_value()
    }

    pub fn live_data(&self, name: &str) -> Option<&LiveDataRef> {
        self.live_data.get(name)
    }

    /// Local mutation of a replica; report it with [`ExtensionClient::live_data_flushed`].
    pub fn live_data_mut(&mut self, name: &str) -> Option<&mut LiveDataRef> {
        self.live_data.get_mut(name)
    }

    pub fn pending_commands(&self) -> usize {
        self.actions.len()
    }

    /// Whether an action issued with command `id` is still waiting for its response.
    pub fn command_pending(&self, id: u64) -> bool {
        self.actions.contains(id)
    }

    pub fn pending_events(&self) -> usize {
        self.dispatcher.pending_len()
    }

    /// Builds the `Register` message and starts waiting for the response.
    pub fn create_registration_request(&mut self, settings: Value) -> Result<Value, ClientError> {
        let request = RegisterRequest::new(&self.uri, settings, self.config.flags_for(&self.uri));
        let message = request.encode()?;
        if self.state == RegistrationState::Unregistered {
            self.state = RegistrationState::AwaitingResponse;
        }
        self.trace_outbound(&message);
        Ok(message)
    }

    /// Associates a document, replays held events, then reports every replica with unreported
    /// changes as a fresh snapshot.
    pub fn bind(&mut self, document: Rc<dyn ExtensionDocument>) {
        self.dispatcher.bind(&document);
        let held = self.dispatcher.take_pending();
        if !held.is_empty() {
            log::debug!("extension {}: replaying {} held events", self.uri, held.len());
        }
        for event in held {
            self.dispatcher.invoke(event);
        }
        for live in self.live_data.values_mut() {
            if live.has_pending_update() {
                let events = live.report_snapshot();
                dispatch_live_events(&mut self.dispatcher, &self.uri, events);
            }
        }
    }

    pub fn process_message_str(&mut self, raw: &str) -> Result<(), ClientError> {
        let message = parse_message(raw).inspect_err(|err| {
            log::warn!("extension {}: {}", self.uri, err);
        })?;
        self.process_message(&message)
    }

    /// Handles one inbound message. `Err` means the message was rejected.
    pub fn process_message(&mut self, message: &Value) -> Result<(), ClientError> {
        let message = match self.dispatcher.document() {
            Some(document) => document.evaluate(message),
            None => message.clone(),
        };
        if self.config.log_messages {
            log::debug!("extension {} <- {}", self.uri, message);
        }
        self.handle_message(&message).inspect_err(|err| {
            log::warn!("extension {} ({}): {}", self.uri, self.token, err);
        })
    }

    fn handle_message(&mut self, message: &Value) -> Result<(), ClientError> {
        let envelope = Envelope::read(message)?;
        envelope.check_version(&self.config.interface_version)?;
        let method = envelope.require_method()?;

        match self.state {
            RegistrationState::Registered => {}
            RegistrationState::Failed => return Err(ClientError::RegistrationFailed),
            _ if !method.is_registration_response() => return Err(ClientError::NotRegistered),
            _ => {}
        }

        match method {
            Method::RegisterSuccess => self.process_registration(message),
            Method::RegisterFailure => {
                if self.registered() {
                    return Err(ClientError::AlreadyRegistered);
                }
                self.state = RegistrationState::Failed;
                Ok(())
            }
            Method::CommandSuccess | Method::CommandFailure => {
                self.process_command_response(method, message)
            }
            Method::Event => self.process_event(message),
            Method::LiveDataUpdate => self.process_live_data_update(message),
            Method::ComponentSuccess | Method::ComponentFailure | Method::ComponentUpdate => {
                self.process_component_response(method, message)
            }
            Method::Register | Method::Command | Method::Component => {
                Err(ClientError::UnexpectedMethod(method))
            }
        }
    }

    fn process_registration(&mut self, message: &Value) -> Result<(), ClientError> {
        if self.registered() {
            return Err(ClientError::AlreadyRegistered);
        }
        let outcome = self.register(message);
        if outcome.is_err() {
            self.state = RegistrationState::Failed;
        }
        outcome
    }

    fn register(&mut self, message: &Value) -> Result<(), ClientError> {
        let success = RegisterSuccess::decode(message)?;
        let parsed = SchemaReader::new(&self.services.property_keys)
            .max_version(self.config.max_schema_version.as_str())
            .read(&success.schema)?;

        self.uri = parsed.schema.uri.clone();
        if success.token != AUTO_TOKEN {
            self.token = success.token;
        } else if self.token.is_empty() {
            self.token = generate_token(&self.uri);
        }

        let environment = success
            .environment
            .map(Environment::Map)
            .unwrap_or_default();
        self.schema = parsed.schema.with_environment(environment);
        self.warnings = parsed.warnings;
        self.live_data = self
            .schema
            .live_data
            .values()
            .map(|definition| (definition.name.clone(), LiveDataRef::from_definition(definition)))
            .collect();
        self.state = RegistrationState::Registered;
        log::debug!("extension {} registered, token {}", self.uri, self.token);
        Ok(())
    }

    /// Builds the `Command` message for `invocation` and tracks `action` until the response.
    pub fn issue_command(
        &self,
        invocation: &CommandInvocation,
        action: Option<&ActionRef>,
    ) -> Result<Value, ClientError> {
        if invocation.uri != self.uri {
            return Err(ClientError::TargetMismatch {
                expected: self.uri.clone(),
                actual: invocation.uri.clone(),
            });
        }
        if invocation.name.is_empty() {
            return Err(ClientError::InvalidCommand("command name is empty"));
        }
        let resource_id = match &invocation.resource_id {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) if id.is_empty() => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(_) => return Err(ClientError::InvalidCommand("resource id is not a string")),
        };

        let id = self.services.command_ids.next_id();
        let message = CommandRequest::new(
            &self.token,
            id,
            &invocation.name,
            &invocation.uri,
            invocation.payload.clone(),
        )
        .with_resource_id(resource_id)
        .encode()?;

        if let Some(action) = action {
            self.actions.track(id, action);
        }
        self.trace_outbound(&message);
        Ok(message)
    }

    fn process_command_response(&mut self, method: Method, message: &Value) -> Result<(), ClientError> {
        let response = CommandResponse::decode(method, message)?;
        let last_issued = self.services.command_ids.last_issued();
        if response.id > last_issued {
            return Err(ClientError::InvalidCommandId {
                id: response.id,
                last_issued,
            });
        }
        match self.actions.take(response.id) {
            Some(action) => {
                action.resolve_with(response.result);
            }
            None => log::debug!(
                "extension {}: no pending action for command {}",
                self.uri,
                response.id
            ),
        }
        Ok(())
    }

    fn process_event(&mut self, message: &Value) -> Result<(), ClientError> {
        let event = EventMessage::decode(message)?;
        let mode = self
            .schema
            .event_mode(&event.name)
            .ok_or_else(|| ClientError::UnknownEvent(event.name.clone()))?;
        self.check_target(&event.target)?;
        self.dispatcher.invoke(ExtensionEvent {
            uri: self.uri.clone(),
            name: event.name,
            payload: event.payload,
            fast_mode: mode.is_fast(),
            resource_id: event.resource_id,
        });
        Ok(())
    }

    fn process_live_data_update(&mut self, message: &Value) -> Result<(), ClientError> {
        let update = LiveDataUpdate::decode(message)?;
        if !self.live_data.contains_key(&update.name) {
            return Err(ClientError::UnknownLiveData(update.name));
        }
        self.check_target(&update.target)?;

        let bound = self.dispatcher.document().is_some();
        let Some(live) = self.live_data.get_mut(&update.name) else {
            return Err(ClientError::UnknownLiveData(update.name));
        };
        for raw in &update.operations {
            let applied = LiveDataOperation::decode(raw)
                .map_err(LiveDataError::from)
                .and_then(|operation| {
                    if bound {
                        live.apply(&operation)
                    } else {
                        live.apply_detached(&operation)
                    }
                });
            if let Err(err) = applied {
                log::warn!(
                    "extension {}: live data '{}' operation skipped: {}",
                    self.uri,
                    update.name,
                    err
                );
            }
        }
        // Without a document the changes stay pending and are reported as a snapshot on bind.
        if bound && live.has_pending_update() {
            let events = live.report_changes();
            dispatch_live_events(&mut self.dispatcher, &self.uri, events);
        }
        Ok(())
    }

    /// Reports changes recorded on one replica since its last report.
    pub fn live_data_flushed(&mut self, name: &str) -> Result<(), ClientError> {
        let Some(live) = self.live_data.get_mut(name) else {
            log::warn!("extension {}: flush for unknown live data '{}'", self.uri, name);
            return Err(ClientError::UnknownLiveData(name.to_owned()));
        };
        let events = live.report_changes();
        dispatch_live_events(&mut self.dispatcher, &self.uri, events);
        Ok(())
    }

    /// Reports every replica with recorded changes; returns how many were reported.
    pub fn flush_live_data(&mut self) -> usize {
        let mut flushed = 0;
        for live in self.live_data.values_mut() {
            if !live.object().has_changes() && !live.has_pending_update() {
                continue;
            }
            let events = live.report_changes();
            dispatch_live_events(&mut self.dispatcher, &self.uri, events);
            flushed += 1;
        }
        flushed
    }

    /// Builds the `Component` message describing `component`'s current state.
    pub fn component_change(&self, component: &dyn ExtensionComponent) -> Result<Value, ClientError> {
        let target = component.uri();
        if target != self.uri {
            return Err(ClientError::TargetMismatch {
                expected: self.uri.clone(),
                actual: target,
            });
        }
        let state = component.resource_state();
        let mut change = ComponentChange::new(&self.uri, &self.token, component.resource_id(), state);
        if matches!(state, ResourceState::Pending | ResourceState::Ready) {
            change.viewport = component.viewport();
            change.payload = Some(
                component
                    .outgoing_properties()
                    .into_iter()
                    .filter(|(name, _)| state == ResourceState::Pending || component.is_dirty(name))
                    .collect(),
            );
        }
        let message = change.encode()?;
        self.trace_outbound(&message);
        Ok(message)
    }

    fn process_component_response(
        &mut self,
        method: Method,
        message: &Value,
    ) -> Result<(), ClientError> {
        let response = ComponentResponse::decode(method, message)?;
        let component = self
            .dispatcher
            .document()
            .and_then(|document| document.find_extension_component(&response.resource_id));
        let Some(component) = component else {
            log::warn!(
                "extension {}: unable to find component '{}'",
                self.uri,
                response.resource_id
            );
            return Ok(());
        };
        match response.method {
            Method::ComponentFailure => component.fail(response.code, &response.message),
            Method::ComponentUpdate => {
                for (name, value) in response.payload.unwrap_or_default() {
                    component.set_calculated(&name, value);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Fails every component of this extension when the connection closed with an error.
    pub fn handle_disconnection(&self, code: i64, message: &str) {
        if code == 0 {
            return;
        }
        log::warn!("extension {} disconnected ({code}): {message}", self.uri);
        let Some(document) = self.dispatcher.document() else {
            return;
        };
        for component in document.extension_components() {
            if component.uri() == self.uri {
                component.fail(code, message);
            }
        }
    }

    fn check_target(&self, target: &str) -> Result<(), ClientError> {
        if target == self.uri {
            Ok(())
        } else {
            Err(ClientError::TargetMismatch {
                expected: self.uri.clone(),
                actual: target.to_owned(),
            })
        }
    }

    fn trace_outbound(&self, message: &Value) {
        if self.config.log_messages {
            log::debug!("extension {} -> {}", self.uri, message);
        }
    }
}

fn dispatch_live_events(dispatcher: &mut EventDispatcher, uri: &str, events: Vec<LiveDataEvent>) {
    for event in events {
        dispatcher.invoke(ExtensionEvent {
            uri: uri.to_owned(),
            name: event.handler.clone(),
            payload: event.payload(),
            fast_mode: true,
            resource_id: None,
        });
    }
}

fn generate_token(uri: &str) -> String {
    format!("{uri}-{}", Uuid::new_v4().simple())
}
