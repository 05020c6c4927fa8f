//! @openapi:info
//! version: 1.2.3
//! title: jsonapi
//! description: Resources linked through JSON:API relationships

/// @openapi:schema
pub struct Foo {
    #[jsonapi(primary = "foos")]
    pub id: String,
    #[jsonapi(attr = "field2")]
    #[validate(required)]
    pub attribute_field: String,
    #[jsonapi(attr = "field3", omitempty)]
    pub nullable_attribute_field: String,
    #[jsonapi(relation = "ref1")]
    pub reference: Bar,
    #[jsonapi(relation = "ref2")]
    pub reference_ptr: Option<Box<Baz>>,
}

/// @openapi:schema
pub struct Bar {
    #[jsonapi(primary = "bars")]
    pub id: String,
    #[jsonapi(attr = "field4")]
    pub attribute_field: String,
    #[jsonapi(relation = "ref3")]
    pub reference_array: Vec<Baz>,
    #[jsonapi(relation = "ref4")]
    pub reference_array_ptr: Vec<Box<Bar>>,
}

/// @openapi:schema
pub struct Baz {
    #[jsonapi(primary = "bazs")]
    pub id: String,
    #[jsonapi(attr = "field5")]
    pub attribute_field: String,
    #[jsonapi(relation = "ref6")]
    pub reference: Qux,
}

/// @openapi:schema
pub struct Qux {
    #[jsonapi(primary = "quxs")]
    pub id: String,
    #[jsonapi(attr = "field7")]
    pub attribute_field: String,
}

/// @openapi:schema
pub struct ErrorsPayload {
    pub errors: Vec<ErrorObject>,
}

/// @openapi:schema
pub struct ErrorObject {
    pub title: String,
    pub code: String,
    pub detail: String,
    pub status: i32,
}
