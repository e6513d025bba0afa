//! Linda operations for applications.
//!
//! Every tuple and template travels with the caller's connection id as an
//! extra leading `uint` field. Connections with the same id share a
//! namespace; different ids never see each other's tuples. The id is added
//! on the way out and checked and stripped on the way back, so callers only
//! ever handle their own fields.

use tuplespace_core::Transport;
use tuplespace_proto::{Field, MAX_ARITY, Operation, Tuple, TupleSpan};

use crate::{
    config::ClientConfig,
    error::ClientError,
    protocol::{ProtocolClient, Response},
};

/// Largest arity a caller can use; one slot goes to the connection id.
pub const MAX_USER_ARITY: usize = MAX_ARITY - 1;

/// Client handle to a tuple space server.
#[derive(Debug)]
pub struct TupleSpace<T: Transport> {
    protocol: ProtocolClient<T>,
}

impl<T: Transport> TupleSpace<T> {
    /// Talk to `config.server` over `transport`.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self { protocol: ProtocolClient::new(transport, config) }
    }

    /// Operations scoped to connection `id`.
    pub fn connection(&mut self, id: u32) -> Connection<'_, T> {
        Connection { protocol: &mut self.protocol, id: Field::uint(id) }
    }

    /// Protocol engine underneath.
    pub fn protocol(&mut self) -> &mut ProtocolClient<T> {
        &mut self.protocol
    }

    /// Tear down the transport.
    pub fn close(mut self) {
        self.protocol.close();
    }
}

/// Linda primitives for one connection id.
#[derive(Debug)]
pub struct Connection<'a, T: Transport> {
    protocol: &'a mut ProtocolClient<T>,
    id: Field,
}

impl<T: Transport> Connection<'_, T> {
    /// Deposit a data tuple.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidTuple`] if a field is a wildcard and
    /// [`ClientError::Encode`] if the tuple with its connection id does not
    /// fit a datagram. Transport failures and an exhausted retry budget are
    /// passed through from [`ProtocolClient::send_tuple`].
    pub fn out(&mut self, tuple: &Tuple) -> Result<(), ClientError> {
        if !tuple.is_data() {
            return Err(ClientError::InvalidTuple("every field needs a value"));
        }
        let span = TupleSpan::prefixed(&self.id, tuple)?;
        self.protocol.send_tuple(&span)
    }

    /// Remove a matching tuple, waiting until one exists.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::request`].
    #[doc(alias = "in")]
    pub fn take(&mut self, template: &Tuple) -> Result<Tuple, ClientError> {
        self.blocking(template, Operation::In)
    }

    /// Remove a matching tuple if one exists now.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::request`].
    #[doc(alias = "inp")]
    pub fn try_take(&mut self, template: &Tuple) -> Result<Option<Tuple>, ClientError> {
        self.request(template, Operation::Inp)
    }

    /// Copy a matching tuple, waiting until one exists.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::request`].
    #[doc(alias = "rd")]
    pub fn read(&mut self, template: &Tuple) -> Result<Tuple, ClientError> {
        self.blocking(template, Operation::Rd)
    }

    /// Copy a matching tuple if one exists now.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::request`].
    #[doc(alias = "rdp")]
    pub fn try_read(&mut self, template: &Tuple) -> Result<Option<Tuple>, ClientError> {
        self.request(template, Operation::Rdp)
    }

    /// Run any of the four template operations.
    ///
    /// `Ok(None)` is the server's "lack of tuple". Blocking operations
    /// never see one: the exchange keeps waiting instead.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidTemplate`] if the template has no
    /// wildcard or more than [`MAX_USER_ARITY`] fields, and
    /// [`ClientError::InvalidResponseProtocol`] if the answer carries another
    /// connection id or does not match the template. Transport failures and
    /// [`ClientError::RetriesExhausted`] come from
    /// [`ProtocolClient::get_tuple`].
    pub fn request(
        &mut self,
        template: &Tuple,
        operation: Operation,
    ) -> Result<Option<Tuple>, ClientError> {
        if template.arity() > MAX_USER_ARITY {
            return Err(ClientError::InvalidTemplate("arity exceeds 15"));
        }
        if template.is_data() {
            return Err(ClientError::InvalidTemplate("template needs at least one wildcard"));
        }
        let span = TupleSpan::prefixed(&self.id, template)
            .map_err(|_| ClientError::InvalidTemplate("arity exceeds 15"))?;

        match self.protocol.get_tuple(&span, operation)? {
            Response::LackOfTuple => Ok(None),
            Response::Tuple(tuple) => self.unwrap_response(template, tuple).map(Some),
        }
    }

    fn blocking(&mut self, template: &Tuple, operation: Operation) -> Result<Tuple, ClientError> {
        self.request(template, operation)?.ok_or(ClientError::InvalidResponseProtocol(
            "lack of tuple for a blocking request",
        ))
    }

    /// Check the connection id and strip it.
    fn unwrap_response(&self, template: &Tuple, tuple: Tuple) -> Result<Tuple, ClientError> {
        let (id, rest) = tuple
            .split_first()
            .map_err(|_| ClientError::InvalidResponseProtocol("missing connection id"))?;
        if id != self.id {
            return Err(ClientError::InvalidResponseProtocol("connection id mismatch"));
        }
        if !template.matches(&rest) {
            return Err(ClientError::InvalidResponseProtocol("tuple does not match template"));
        }
        Ok(rest)
    }
}
