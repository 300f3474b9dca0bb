//! `CIM` / `MESSAGE` envelopes, method calls and method responses.

use bytes::Bytes;
use cim_model::{Argument, DataType, ObjectPath, QualifierType, Scalar, TypedValue};
use tracing::{debug, trace, warn};

use crate::element::{Element, XmlNode};
use crate::embedded::embedded_kind;
use crate::error::{DecodeError, ProtocolError, StatusCode};
use crate::object::{expect, is_null_type, CimObject, Decoder, ValueShape};
use crate::tag::Tag;
use crate::token::XmlTokenizer;

type Result<T> = std::result::Result<T, DecodeError>;

const BODY_TAGS: &[Tag] = &[
    Tag::SimpleReq,
    Tag::MultiReq,
    Tag::SimpleRsp,
    Tag::MultiRsp,
    Tag::SimpleExpReq,
    Tag::MultiExpReq,
    Tag::SimpleExpRsp,
    Tag::MultiExpRsp,
];

/// `IRETURNVALUE` child groups, in the order they are collected.
pub const IRETURNVALUE_GROUPS: &[Tag] = &[
    Tag::ClassName,
    Tag::InstanceName,
    Tag::Value,
    Tag::ValueObjectWithPath,
    Tag::ValueObjectWithLocalPath,
    Tag::ValueObject,
    Tag::ObjectPath,
    Tag::QualifierDeclaration,
    Tag::ValueArray,
    Tag::ValueReference,
    Tag::Class,
    Tag::Instance,
    Tag::InstancePath,
    Tag::ValueNamedInstance,
    Tag::ValueInstanceWithPath,
    Tag::ValueNamedObject,
];

const IPARAM_SHAPES: &[Tag] = &[
    Tag::Value,
    Tag::ValueArray,
    Tag::ValueReference,
    Tag::ValueRefArray,
    Tag::ClassName,
    Tag::InstanceName,
    Tag::QualifierDeclaration,
    Tag::Class,
    Tag::Instance,
    Tag::ValueNamedInstance,
];

const VALUE_SHAPES: &[ValueShape] = &[
    ValueShape::Value,
    ValueShape::Reference,
    ValueShape::Array,
    ValueShape::RefArray,
];

/// Kind of method a request invokes or a response answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// `IMETHODCALL` / `IMETHODRESPONSE`.
    Intrinsic,
    /// `METHODCALL` / `METHODRESPONSE`.
    Extrinsic,
    /// `EXPMETHODCALL` / `EXPMETHODRESPONSE`.
    Export,
}

/// A decoded `CIM` document.
#[derive(Debug, Clone, PartialEq)]
pub struct CimMessage {
    pub id: String,
    pub protocol_version: String,
    pub cim_version: String,
    pub dtd_version: String,
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Request(CimRequest),
    Response(CimResponse),
}

impl CimMessage {
    pub fn request(&self) -> Option<&CimRequest> {
        match &self.body {
            MessageBody::Request(request) => Some(request),
            MessageBody::Response(_) => None,
        }
    }

    pub fn response(&self) -> Option<&CimResponse> {
        match &self.body {
            MessageBody::Response(response) => Some(response),
            MessageBody::Request(_) => None,
        }
    }

    pub fn into_response(self) -> Option<CimResponse> {
        match self.body {
            MessageBody::Response(response) => Some(response),
            MessageBody::Request(_) => None,
        }
    }
}

/// A method call, or a batch of them for `MULTIREQ` / `MULTIEXPREQ`.
#[derive(Debug, Clone, PartialEq)]
pub struct CimRequest {
    /// Envelope element the request was carried in.
    pub tag: Tag,
    pub id: String,
    /// `None` for batch wrappers.
    pub kind: Option<CallKind>,
    pub method: String,
    pub namespace: Option<String>,
    /// Class or instance an extrinsic method is invoked on.
    pub target: Option<ObjectPath>,
    pub params: Vec<Argument>,
    /// Intrinsic `QUALIFIER.DECLARATION` parameters, by parameter name.
    pub qualifier_declarations: Vec<(String, QualifierType)>,
    pub requests: Vec<CimRequest>,
}

impl CimRequest {
    fn call(kind: CallKind, method: &str) -> Self {
        Self {
            tag: Tag::SimpleReq,
            id: String::new(),
            kind: Some(kind),
            method: method.to_string(),
            namespace: None,
            target: None,
            params: Vec::new(),
            qualifier_declarations: Vec::new(),
            requests: Vec::new(),
        }
    }

    fn batch(tag: Tag, requests: Vec<CimRequest>) -> Self {
        Self {
            tag,
            kind: None,
            requests,
            ..Self::call(CallKind::Intrinsic, "")
        }
    }

    pub fn param(&self, name: &str) -> Option<&Argument> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    fn stamp(&mut self, id: &str) {
        self.id = id.to_string();
        for request in &mut self.requests {
            request.stamp(id);
        }
    }
}

/// A method response, or a batch of them for `MULTIRSP` / `MULTIEXPRSP`.
#[derive(Debug, Clone, PartialEq)]
pub struct CimResponse {
    pub tag: Tag,
    pub id: String,
    pub kind: Option<CallKind>,
    pub method: String,
    pub error: Option<ProtocolError>,
    /// `RETURNVALUE` of an extrinsic method.
    pub return_value: Option<TypedValue>,
    /// `IRETURNVALUE` items, grouped by element kind.
    pub objects: Vec<CimObject>,
    pub params: Vec<Argument>,
    pub responses: Vec<CimResponse>,
}

impl CimResponse {
    fn call(kind: CallKind, method: &str) -> Self {
        Self {
            tag: Tag::SimpleRsp,
            id: String::new(),
            kind: Some(kind),
            method: method.to_string(),
            error: None,
            return_value: None,
            objects: Vec::new(),
            params: Vec::new(),
            responses: Vec::new(),
        }
    }

    fn batch(tag: Tag, responses: Vec<CimResponse>) -> Self {
        Self {
            tag,
            kind: None,
            responses,
            ..Self::call(CallKind::Intrinsic, "")
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The response itself, or its `ERROR`.
    pub fn into_result(self) -> std::result::Result<Self, ProtocolError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }

    pub fn param(&self, name: &str) -> Option<&Argument> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    fn stamp(&mut self, id: &str) {
        self.id = id.to_string();
        for response in &mut self.responses {
            response.stamp(id);
        }
    }
}

enum IParam {
    Value(Argument),
    Declaration(String, QualifierType),
}

impl Decoder {
    /// Parse and decode a whole `CIM` document.
    pub fn decode_message_str(&self, xml: &str) -> Result<CimMessage> {
        self.decode_cim(&Element::parse(xml)?)
    }

    /// Decode a complete response or request body.
    pub fn decode_message_bytes(&self, body: Bytes) -> Result<CimMessage> {
        self.decode_cim(&Element::from_tokens(&mut XmlTokenizer::from_bytes(body))?)
    }

    pub fn decode_cim<N: XmlNode>(&self, node: &N) -> Result<CimMessage> {
        expect(node, Tag::Cim)?;
        let cim_version = node.require_attr(Tag::Cim, "CIMVERSION")?;
        let dtd_version = node.require_attr(Tag::Cim, "DTDVERSION")?;
        check_cim_versions(cim_version, dtd_version)?;
        let message = node.require_child(Tag::Cim, Tag::Message)?;
        let id = message.require_attr(Tag::Message, "ID")?;
        let protocol_version = message.require_attr(Tag::Message, "PROTOCOLVERSION")?;
        check_protocol_version(protocol_version)?;

        let mut bodies = message
            .children()
            .iter()
            .filter(|child| BODY_TAGS.iter().any(|tag| child.is(*tag)));
        let body = bodies.next().ok_or(DecodeError::MissingElement {
            production: Tag::Message.as_str(),
            child: "SIMPLEREQ|MULTIREQ|SIMPLERSP|MULTIRSP|SIMPLEEXPREQ|MULTIEXPREQ",
        })?;
        if let Some(extra) = bodies.next() {
            return Err(DecodeError::invalid(
                Tag::Message.as_str(),
                format!("{} follows {}", extra.name(), body.name()),
            ));
        }

        let body = match body.tag() {
            Some(Tag::SimpleReq) => {
                let mut request = self.decode_simple_req(body)?;
                request.stamp(id);
                MessageBody::Request(request)
            }
            Some(Tag::SimpleExpReq) => {
                let mut request = self.decode_simple_exp_req(body)?;
                request.stamp(id);
                MessageBody::Request(request)
            }
            Some(tag @ (Tag::MultiReq | Tag::MultiExpReq)) => {
                let inner = if tag == Tag::MultiReq {
                    Tag::SimpleReq
                } else {
                    Tag::SimpleExpReq
                };
                let requests = body
                    .children_named(inner)
                    .map(|simple| match inner {
                        Tag::SimpleReq => self.decode_simple_req(simple),
                        _ => self.decode_simple_exp_req(simple),
                    })
                    .collect::<Result<Vec<_>>>()?;
                if requests.is_empty() {
                    return Err(DecodeError::MissingElement {
                        production: tag.as_str(),
                        child: inner.as_str(),
                    });
                }
                let mut request = CimRequest::batch(tag, requests);
                request.stamp(id);
                MessageBody::Request(request)
            }
            Some(Tag::SimpleRsp) => {
                let mut response = self.decode_simple_rsp(body)?;
                response.stamp(id);
                MessageBody::Response(response)
            }
            Some(Tag::SimpleExpRsp) => {
                let mut response = self.decode_simple_exp_rsp(body)?;
                response.stamp(id);
                MessageBody::Response(response)
            }
            Some(tag @ (Tag::MultiRsp | Tag::MultiExpRsp)) => {
                let inner = if tag == Tag::MultiRsp {
                    Tag::SimpleRsp
                } else {
                    Tag::SimpleExpRsp
                };
                let responses = body
                    .children_named(inner)
                    .map(|simple| match inner {
                        Tag::SimpleRsp => self.decode_simple_rsp(simple),
                        _ => self.decode_simple_exp_rsp(simple),
                    })
                    .collect::<Result<Vec<_>>>()?;
                if responses.is_empty() {
                    return Err(DecodeError::MissingElement {
                        production: tag.as_str(),
                        child: inner.as_str(),
                    });
                }
                let mut response = CimResponse::batch(tag, responses);
                response.stamp(id);
                MessageBody::Response(response)
            }
            _ => {
                return Err(DecodeError::invalid(
                    Tag::Message.as_str(),
                    format!("unexpected body {}", body.name()),
                ))
            }
        };
        debug!(id, protocol = protocol_version, "decoded CIM message");
        Ok(CimMessage {
            id: id.to_string(),
            protocol_version: protocol_version.to_string(),
            cim_version: cim_version.to_string(),
            dtd_version: dtd_version.to_string(),
            body,
        })
    }

    fn decode_simple_req<N: XmlNode>(&self, node: &N) -> Result<CimRequest> {
        let mut request = if let Some(call) = node.child(Tag::IMethodCall) {
            self.decode_imethod_call(call)?
        } else if let Some(call) = node.child(Tag::MethodCall) {
            self.decode_method_call(call)?
        } else {
            return Err(DecodeError::MissingElement {
                production: Tag::SimpleReq.as_str(),
                child: "IMETHODCALL|METHODCALL",
            });
        };
        request.tag = Tag::SimpleReq;
        Ok(request)
    }

    fn decode_simple_exp_req<N: XmlNode>(&self, node: &N) -> Result<CimRequest> {
        let mut request =
            self.decode_exp_method_call(node.require_child(Tag::SimpleExpReq, Tag::ExpMethodCall)?)?;
        request.tag = Tag::SimpleExpReq;
        Ok(request)
    }

    fn decode_simple_rsp<N: XmlNode>(&self, node: &N) -> Result<CimResponse> {
        let mut response = if let Some(rsp) = node.child(Tag::IMethodResponse) {
            self.decode_imethod_response(rsp)?
        } else if let Some(rsp) = node.child(Tag::MethodResponse) {
            self.decode_method_response(rsp)?
        } else {
            return Err(DecodeError::MissingElement {
                production: Tag::SimpleRsp.as_str(),
                child: "IMETHODRESPONSE|METHODRESPONSE",
            });
        };
        response.tag = Tag::SimpleRsp;
        Ok(response)
    }

    fn decode_simple_exp_rsp<N: XmlNode>(&self, node: &N) -> Result<CimResponse> {
        let mut response = self.decode_exp_method_response(
            node.require_child(Tag::SimpleExpRsp, Tag::ExpMethodResponse)?,
        )?;
        response.tag = Tag::SimpleExpRsp;
        Ok(response)
    }

    // ---- calls ----

    /// `IMETHODCALL`: namespace plus named intrinsic parameters.
    pub fn decode_imethod_call<N: XmlNode>(&self, node: &N) -> Result<CimRequest> {
        expect(node, Tag::IMethodCall)?;
        let name = node.require_attr(Tag::IMethodCall, "NAME")?;
        let namespace = self.decode_local_namespace_path(
            node.require_child(Tag::IMethodCall, Tag::LocalNamespacePath)?,
        )?;
        let mut request = CimRequest::call(CallKind::Intrinsic, name);
        // parameter paths get the call namespace, never the base context
        let local = self.with_base(ObjectPath::default());
        for param in node.children_named(Tag::IParamValue) {
            match local.decode_iparam_value(param, &namespace)? {
                IParam::Value(arg) => request.params.push(arg),
                IParam::Declaration(name, decl) => request.qualifier_declarations.push((name, decl)),
            }
        }
        debug!(method = name, namespace = %namespace, params = request.params.len(), "decoded intrinsic call");
        request.namespace = Some(namespace);
        Ok(request)
    }

    fn decode_iparam_value<N: XmlNode>(&self, node: &N, namespace: &str) -> Result<IParam> {
        let name = node.require_attr(Tag::IParamValue, "NAME")?;
        let Some(child) = node.child_of(IPARAM_SHAPES) else {
            return Ok(IParam::Value(Argument::new(
                name,
                TypedValue::null(DataType::string()),
            )));
        };
        let as_references = self.config.object_params_as_references;
        let mut value = match child.tag() {
            Some(Tag::Value | Tag::ValueArray | Tag::ValueReference | Tag::ValueRefArray) => {
                self.decode_value_or_array(Tag::IParamValue, node, None, false, VALUE_SHAPES)?
            }
            Some(Tag::ClassName) => {
                TypedValue::reference(ObjectPath::new(self.decode_class_name(child)?))
            }
            Some(Tag::InstanceName) => TypedValue::reference(self.decode_instance_name(child)?),
            Some(Tag::QualifierDeclaration) => {
                let mut decl = self.decode_qualifier_declaration(child)?;
                inherit_namespace(name, &mut decl.path, namespace);
                if !as_references {
                    return Ok(IParam::Declaration(name.to_string(), decl));
                }
                TypedValue::reference(decl.path)
            }
            Some(Tag::Class) => {
                let class = self.decode_class(child)?;
                if as_references {
                    TypedValue::reference(class.path)
                } else {
                    TypedValue::scalar(Scalar::Class(Box::new(class)))
                }
            }
            _ => {
                let instance = if child.is(Tag::Instance) {
                    self.decode_instance(child)?
                } else {
                    self.decode_value_named_instance(child)?
                };
                if as_references {
                    TypedValue::reference(instance.path)
                } else {
                    TypedValue::scalar(Scalar::Instance(Box::new(instance)))
                }
            }
        };
        for scalar in value.value.scalars_mut() {
            let path = match scalar {
                Scalar::Reference(path) => path,
                Scalar::Class(class) => &mut class.path,
                Scalar::Instance(instance) => &mut instance.path,
                _ => continue,
            };
            inherit_namespace(name, path, namespace);
        }
        Ok(IParam::Value(Argument::new(name, value)))
    }

    /// `METHODCALL`: local target path plus ordered parameters.
    pub fn decode_method_call<N: XmlNode>(&self, node: &N) -> Result<CimRequest> {
        expect(node, Tag::MethodCall)?;
        let name = node.require_attr(Tag::MethodCall, "NAME")?;
        let target = if let Some(path) = node.child(Tag::LocalInstancePath) {
            self.decode_local_instance_path(path)?
        } else if let Some(path) = node.child(Tag::LocalClassPath) {
            self.decode_local_class_path(path)?
        } else {
            return Err(DecodeError::MissingElement {
                production: Tag::MethodCall.as_str(),
                child: "LOCALCLASSPATH|LOCALINSTANCEPATH",
            });
        };
        let mut request = CimRequest::call(CallKind::Extrinsic, name);
        request.params = node
            .children_named(Tag::ParamValue)
            .map(|param| self.decode_param_value(param))
            .collect::<Result<_>>()?;
        request.namespace = target.namespace.clone();
        debug!(method = name, target = %target, "decoded extrinsic call");
        request.target = Some(target);
        Ok(request)
    }

    /// `EXPMETHODCALL`: export (indication) delivery.
    pub fn decode_exp_method_call<N: XmlNode>(&self, node: &N) -> Result<CimRequest> {
        expect(node, Tag::ExpMethodCall)?;
        let name = node.require_attr(Tag::ExpMethodCall, "NAME")?;
        let mut request = CimRequest::call(CallKind::Export, name);
        for param in node.children_named(Tag::ExpParamValue) {
            let param_name = param.require_attr(Tag::ExpParamValue, "NAME")?;
            let value = match param.child(Tag::Instance) {
                Some(instance) => {
                    TypedValue::scalar(Scalar::Instance(Box::new(self.decode_instance(instance)?)))
                }
                None => self.decode_value_or_array(
                    Tag::ExpParamValue,
                    param,
                    None,
                    false,
                    &[ValueShape::Value, ValueShape::Array],
                )?,
            };
            request.params.push(Argument::new(param_name, value));
        }
        Ok(request)
    }

    /// `PARAMVALUE` of an extrinsic call or response.
    pub fn decode_param_value<N: XmlNode>(&self, node: &N) -> Result<Argument> {
        expect(node, Tag::ParamValue)?;
        let name = node.require_attr(Tag::ParamValue, "NAME")?;
        if is_null_type(node.attribute("PARAMTYPE")) {
            return Ok(Argument::new(name, TypedValue::null(DataType::string())));
        }
        let explicit = param_type(node, Tag::ParamValue)?;
        if let Some(kind) = embedded_kind(node, Tag::ParamValue, &[])? {
            let raw = explicit.unwrap_or_else(DataType::string);
            let value = match node.child(Tag::ValueArray) {
                Some(array) => self.decode_embedded_array(
                    Tag::ParamValue,
                    kind,
                    &raw.with_array_size(0),
                    Some(array),
                )?,
                None => self.decode_embedded_scalar(
                    Tag::ParamValue,
                    kind,
                    &raw,
                    node.child(Tag::Value),
                )?,
            };
            return Ok(Argument::new(name, value));
        }
        let has_value = VALUE_SHAPES.iter().any(|shape| node.child(shape.tag()).is_some());
        let object = node.child_of(&[
            Tag::ClassName,
            Tag::InstanceName,
            Tag::Class,
            Tag::Instance,
            Tag::ValueNamedInstance,
        ]);
        let value = match object {
            Some(object) if !has_value => match object.tag() {
                Some(Tag::ClassName | Tag::InstanceName) => {
                    TypedValue::reference(self.decode_any_path(object)?)
                }
                Some(Tag::Class) => {
                    TypedValue::scalar(Scalar::Class(Box::new(self.decode_class(object)?)))
                }
                Some(Tag::Instance) => {
                    TypedValue::scalar(Scalar::Instance(Box::new(self.decode_instance(object)?)))
                }
                _ => TypedValue::scalar(Scalar::Instance(Box::new(
                    self.decode_value_named_instance(object)?,
                ))),
            },
            _ => self.decode_value_or_array(
                Tag::ParamValue,
                node,
                explicit.as_ref(),
                false,
                VALUE_SHAPES,
            )?,
        };
        Ok(Argument::new(name, value))
    }

    // ---- responses ----

    /// `METHODRESPONSE`: an `ERROR`, or a return value and output parameters.
    pub fn decode_method_response<N: XmlNode>(&self, node: &N) -> Result<CimResponse> {
        expect(node, Tag::MethodResponse)?;
        let name = node.require_attr(Tag::MethodResponse, "NAME")?;
        let mut response = CimResponse::call(CallKind::Extrinsic, name);
        if let Some(error) = node.child(Tag::Error) {
            response.error = Some(self.decode_error(error)?);
            return Ok(response);
        }
        if let Some(rv) = node.child(Tag::ReturnValue) {
            response.return_value = Some(self.decode_return_value(rv)?);
            if self.config.return_value_params {
                for param in rv.children_named(Tag::ParamValue) {
                    trace!(method = name, "collecting PARAMVALUE nested in RETURNVALUE");
                    response.params.push(self.decode_param_value(param)?);
                }
            }
        }
        for param in node.children_named(Tag::ParamValue) {
            response.params.push(self.decode_param_value(param)?);
        }
        Ok(response)
    }

    fn decode_return_value<N: XmlNode>(&self, node: &N) -> Result<TypedValue> {
        if is_null_type(node.attribute("PARAMTYPE")) {
            return Ok(TypedValue::null(DataType::string()));
        }
        let explicit = param_type(node, Tag::ReturnValue)?;
        if let Some(kind) = embedded_kind(node, Tag::ReturnValue, &[])? {
            let raw = explicit.unwrap_or_else(DataType::string);
            return self.decode_embedded_scalar(Tag::ReturnValue, kind, &raw, node.child(Tag::Value));
        }
        self.decode_value_or_array(
            Tag::ReturnValue,
            node,
            explicit.as_ref(),
            false,
            &[ValueShape::Value, ValueShape::Reference],
        )
    }

    /// `IMETHODRESPONSE`: an `ERROR`, or returned objects and output parameters.
    pub fn decode_imethod_response<N: XmlNode>(&self, node: &N) -> Result<CimResponse> {
        expect(node, Tag::IMethodResponse)?;
        let name = node.require_attr(Tag::IMethodResponse, "NAME")?;
        let mut response = CimResponse::call(CallKind::Intrinsic, name);
        if let Some(error) = node.child(Tag::Error) {
            response.error = Some(self.decode_error(error)?);
            return Ok(response);
        }
        if let Some(rv) = node.child(Tag::IReturnValue) {
            response.objects = self.decode_ireturn_value(rv)?;
        }
        for param in node.children_named(Tag::ParamValue) {
            response.params.push(self.decode_param_value(param)?);
        }
        debug!(method = name, objects = response.objects.len(), "decoded intrinsic response");
        Ok(response)
    }

    /// `EXPMETHODRESPONSE`: an `ERROR` or an optional `IRETURNVALUE`.
    pub fn decode_exp_method_response<N: XmlNode>(&self, node: &N) -> Result<CimResponse> {
        expect(node, Tag::ExpMethodResponse)?;
        let name = node.require_attr(Tag::ExpMethodResponse, "NAME")?;
        let mut response = CimResponse::call(CallKind::Export, name);
        if let Some(error) = node.child(Tag::Error) {
            response.error = Some(self.decode_error(error)?);
        } else if let Some(rv) = node.child(Tag::IReturnValue) {
            response.objects = self.decode_ireturn_value(rv)?;
        }
        Ok(response)
    }

    /// `IRETURNVALUE`: every recognised child, one element kind at a time.
    pub fn decode_ireturn_value<N: XmlNode>(&self, node: &N) -> Result<Vec<CimObject>> {
        expect(node, Tag::IReturnValue)?;
        let mut objects = Vec::with_capacity(node.children().len());
        for group in IRETURNVALUE_GROUPS {
            for child in node.children_named(*group) {
                objects.push(self.decode_object(child)?);
            }
        }
        if objects.len() < node.children().len() {
            let unknown: Vec<&str> = node
                .children()
                .iter()
                .filter(|child| !IRETURNVALUE_GROUPS.iter().any(|tag| child.is(*tag)))
                .map(XmlNode::name)
                .collect();
            warn!(?unknown, "ignoring unexpected IRETURNVALUE children");
        }
        Ok(objects)
    }

    /// `ERROR`; an unparsable `CODE` is reported as `CIM_ERR_FAILED`.
    pub fn decode_error<N: XmlNode>(&self, node: &N) -> Result<ProtocolError> {
        expect(node, Tag::Error)?;
        let raw = node.require_attr(Tag::Error, "CODE")?;
        let code = raw.trim().parse::<u32>().unwrap_or_else(|err| {
            warn!(code = raw, %err, "unparsable CODE, reporting CIM_ERR_FAILED");
            StatusCode::Failed.to_raw()
        });
        let instances = node
            .children_named(Tag::Instance)
            .map(|instance| self.decode_instance(instance))
            .collect::<Result<Vec<_>>>()?;
        let error = ProtocolError {
            code,
            description: node.attribute("DESCRIPTION").unwrap_or_default().to_string(),
            instances,
        };
        debug!(code, status = ?error.status(), description = %error.description, "decoded ERROR");
        Ok(error)
    }
}

fn inherit_namespace(param: &str, path: &mut ObjectPath, namespace: &str) {
    if path.namespace.as_deref().map_or(true, str::is_empty) {
        trace!(param, namespace, "parameter path inherits call namespace");
        path.namespace = Some(namespace.to_string());
    }
}

fn param_type<N: XmlNode>(node: &N, production: Tag) -> Result<Option<DataType>> {
    node.attribute("PARAMTYPE")
        .map(|name| DataType::from_name(Some(name), false))
        .transpose()
        .map_err(DecodeError::value(production.as_str()))
}

/// `CIMVERSION` and `DTDVERSION` must both be 2.x.
pub fn check_cim_versions(cim_version: &str, dtd_version: &str) -> Result<()> {
    check_major("CIMVERSION", cim_version, 2)?;
    check_major("DTDVERSION", dtd_version, 2)
}

/// `PROTOCOLVERSION` must be 1.x.
pub fn check_protocol_version(version: &str) -> Result<()> {
    check_major("PROTOCOLVERSION", version, 1)
}

fn check_major(attribute: &str, version: &str, major: u32) -> Result<()> {
    let found = version
        .trim()
        .split('.')
        .next()
        .and_then(|part| part.parse::<u32>().ok());
    if found == Some(major) {
        Ok(())
    } else {
        Err(DecodeError::Version(format!(
            "{attribute}={version:?}, expected {major}.x"
        )))
    }
}
