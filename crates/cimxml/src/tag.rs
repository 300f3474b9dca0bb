//! Closed set of CIM-XML element names.

use std::fmt;

macro_rules! tags {
    ($($variant:ident => $name:literal,)*) => {
        /// Element of the CIM-XML DTD (DSP0201).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Tag {
            $($variant,)*
        }

        impl Tag {
            /// Every element known to the decoder.
            pub const ALL: &'static [Tag] = &[$(Tag::$variant,)*];

            /// Element name exactly as it appears on the wire.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Tag::$variant => $name,)*
                }
            }

            /// Look up an element name; names are case-sensitive.
            pub fn from_name(name: &str) -> Option<Tag> {
                match name {
                    $($name => Some(Tag::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

tags! {
    Cim => "CIM",
    Message => "MESSAGE",
    SimpleReq => "SIMPLEREQ",
    MultiReq => "MULTIREQ",
    SimpleRsp => "SIMPLERSP",
    MultiRsp => "MULTIRSP",
    SimpleExpReq => "SIMPLEEXPREQ",
    MultiExpReq => "MULTIEXPREQ",
    SimpleExpRsp => "SIMPLEEXPRSP",
    MultiExpRsp => "MULTIEXPRSP",
    MethodCall => "METHODCALL",
    IMethodCall => "IMETHODCALL",
    ExpMethodCall => "EXPMETHODCALL",
    ParamValue => "PARAMVALUE",
    IParamValue => "IPARAMVALUE",
    ExpParamValue => "EXPPARAMVALUE",
    MethodResponse => "METHODRESPONSE",
    IMethodResponse => "IMETHODRESPONSE",
    ExpMethodResponse => "EXPMETHODRESPONSE",
    Error => "ERROR",
    ReturnValue => "RETURNVALUE",
    IReturnValue => "IRETURNVALUE",
    NamespacePath => "NAMESPACEPATH",
    LocalNamespacePath => "LOCALNAMESPACEPATH",
    Host => "HOST",
    Namespace => "NAMESPACE",
    ClassPath => "CLASSPATH",
    LocalClassPath => "LOCALCLASSPATH",
    ClassName => "CLASSNAME",
    InstancePath => "INSTANCEPATH",
    LocalInstancePath => "LOCALINSTANCEPATH",
    InstanceName => "INSTANCENAME",
    ObjectPath => "OBJECTPATH",
    KeyBinding => "KEYBINDING",
    KeyValue => "KEYVALUE",
    Value => "VALUE",
    ValueArray => "VALUE.ARRAY",
    ValueReference => "VALUE.REFERENCE",
    ValueRefArray => "VALUE.REFARRAY",
    ValueNull => "VALUE.NULL",
    ValueObject => "VALUE.OBJECT",
    ValueNamedInstance => "VALUE.NAMEDINSTANCE",
    ValueNamedObject => "VALUE.NAMEDOBJECT",
    ValueObjectWithPath => "VALUE.OBJECTWITHPATH",
    ValueObjectWithLocalPath => "VALUE.OBJECTWITHLOCALPATH",
    ValueInstanceWithPath => "VALUE.INSTANCEWITHPATH",
    Qualifier => "QUALIFIER",
    QualifierDeclaration => "QUALIFIER.DECLARATION",
    Scope => "SCOPE",
    Property => "PROPERTY",
    PropertyArray => "PROPERTY.ARRAY",
    PropertyReference => "PROPERTY.REFERENCE",
    Method => "METHOD",
    Parameter => "PARAMETER",
    ParameterReference => "PARAMETER.REFERENCE",
    ParameterArray => "PARAMETER.ARRAY",
    ParameterRefArray => "PARAMETER.REFARRAY",
    Class => "CLASS",
    Instance => "INSTANCE",
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for tag in Tag::ALL {
            assert_eq!(Tag::from_name(tag.as_str()), Some(*tag));
        }
        assert_eq!(Tag::from_name("value.array"), None);
        assert_eq!(Tag::from_name("DECLGROUP"), None);
    }
}
